use std::any::Any;
use std::fmt::Debug;

use arcstr::ArcStr;

use crate::context::ModuleCtx;
use crate::error::Result;
use crate::tech::Tech;

/// A generator of one kind of module.
///
/// [`Component::new`] validates parameters and fails with
/// [`crate::error::Error::Config`] for unsupported combinations;
/// [`Component::generate`] places children, routes, and declares ports.
pub trait Component: Any {
    /// Parameters uniquely identifying the generated module.
    ///
    /// The `Debug` rendering of the parameters is the cache key.
    type Params: Debug + Clone + 'static;

    fn new(params: &Self::Params, tech: &Tech) -> Result<Self>
    where
        Self: Sized;

    fn name(&self) -> ArcStr;

    fn generate(&self, ctx: &mut ModuleCtx) -> Result<()>;
}

/// Parameters for components that take none.
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq, Hash)]
pub struct NoParams;
