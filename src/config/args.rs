// Startup argument shapes accepted by `initialise_server`.
// Handlers alone, options alone, both, or neither.

use super::Options;
use crate::handler::{Handler, Handlers};

/// Options plus caller handlers, however the caller chose to pass them
#[derive(Debug, Clone, Default)]
pub struct ServerArgs {
    pub options: Option<Options>,
    pub handlers: Handlers,
}

/// A bare sequence is the handler list; options are absent
impl From<Vec<Handler>> for ServerArgs {
    fn from(handlers: Vec<Handler>) -> Self {
        Self {
            options: None,
            handlers: handlers.into(),
        }
    }
}

impl From<Handler> for ServerArgs {
    fn from(handler: Handler) -> Self {
        Self {
            options: None,
            handlers: handler.into(),
        }
    }
}

impl From<Options> for ServerArgs {
    fn from(options: Options) -> Self {
        Self {
            options: Some(options),
            handlers: Handlers::new(),
        }
    }
}

impl<H: Into<Handlers>> From<(Options, H)> for ServerArgs {
    fn from((options, handlers): (Options, H)) -> Self {
        Self {
            options: Some(options),
            handlers: handlers.into(),
        }
    }
}

impl<H: Into<Handlers>> From<(Option<Options>, H)> for ServerArgs {
    fn from((options, handlers): (Option<Options>, H)) -> Self {
        Self {
            options,
            handlers: handlers.into(),
        }
    }
}

impl From<()> for ServerArgs {
    fn from((): ()) -> Self {
        Self::default()
    }
}
