use crate::env::Environment;
use crate::error::ShellError;
use log::debug;
use std::io::{Read, Write};

/// Object-safe trait for any program the shell can dispatch to.
///
/// Implemented by builtins via a blanket impl and by test doubles.
pub trait Application {
    /// Runs the application with the arguments it was created with.
    fn run(
        self: Box<Self>,
        input: &mut dyn Read,
        output: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), ShellError>;
}

/// Factory that tries to create an application from a name and its arguments.
///
/// Returns `None` when the factory doesn't recognize the `name`.
pub trait ApplicationFactory {
    /// Attempt to create an application instance for the provided name and arguments.
    fn try_create(
        &self,
        env: &Environment,
        name: &str,
        args: &[&str],
    ) -> Option<Box<dyn Application>>;
}

/// Factory for one statically known application type.
///
/// See the `ApplicationFactory` impl in [`builtin`](crate::builtin).
pub(crate) struct Factory<T> {
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Default for Factory<T> {
    fn default() -> Self {
        Self {
            _phantom: std::marker::PhantomData,
        }
    }
}

/// Registry of applications, queried in registration order.
pub struct ApplicationRunner {
    factories: Vec<Box<dyn ApplicationFactory>>,
}

impl ApplicationRunner {
    pub fn new(factories: Vec<Box<dyn ApplicationFactory>>) -> Self {
        Self { factories }
    }

    /// Add a factory; it is consulted after the ones already registered.
    pub fn register(&mut self, factory: Box<dyn ApplicationFactory>) {
        self.factories.push(factory);
    }

    /// Dispatch `name` with `args` to the first factory that knows it.
    pub fn run_app(
        &self,
        name: &str,
        args: &[String],
        input: &mut dyn Read,
        output: &mut dyn Write,
        env: &mut Environment,
    ) -> Result<(), ShellError> {
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        let app = self
            .factories
            .iter()
            .find_map(|factory| factory.try_create(env, name, &args))
            .ok_or_else(|| ShellError::UnknownApplication(name.to_string()))?;

        debug!("running {} {:?}", name, args);
        app.run(input, output, env)
    }
}

impl Default for ApplicationRunner {
    /// A runner with every builtin registered.
    fn default() -> Self {
        use crate::builtin::*;
        Self::new(vec![
            Box::new(Factory::<Pwd>::default()),
            Box::new(Factory::<Cd>::default()),
            Box::new(Factory::<Ls>::default()),
            Box::new(Factory::<Echo>::default()),
            Box::new(Factory::<Cat>::default()),
            Box::new(Factory::<Head>::default()),
            Box::new(Factory::<Tail>::default()),
            Box::new(Factory::<WC>::default()),
            Box::new(Factory::<Grep>::default()),
            Box::new(Factory::<Sort>::default()),
            Box::new(Factory::<Exit>::default()),
        ])
    }
}
