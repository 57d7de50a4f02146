//! Error types for bean container construction and teardown.

use thiserror::Error;

/// Boxed error returned by user hooks (post-construct, destroy, factory production).
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while scanning, wiring, constructing or closing a container.
///
/// Every fatal condition surfaces synchronously from [`Context::create`](crate::Context::create)
/// or [`Context::extend`](crate::Context::extend); nothing is retried.
///
/// # Examples
///
/// ```rust
/// use ferrous_beans::BeansError;
///
/// let cycle = BeansError::Cycle {
///     path: vec!["app::A".into(), "app::B".into(), "app::A".into()],
/// };
/// assert_eq!(cycle.to_string(), "detected cycle dependency app::A -> app::B -> app::A");
///
/// let missing = BeansError::Unresolved {
///     required: "app::Database",
///     required_by: vec!["app::Repo->db".into()],
/// };
/// assert!(missing.to_string().contains("can not find candidates for 'app::Database'"));
/// ```
#[derive(Debug, Error)]
pub enum BeansError {
    /// Descriptor of a bean type is malformed.
    #[error("invalid descriptor of '{bean}': {reason}")]
    Descriptor { bean: &'static str, reason: String },

    /// A scan entry failed; wraps the underlying error with its position.
    #[error("object '{bean}' at position '{position}' error, {source}")]
    Scan {
        position: String,
        bean: &'static str,
        #[source]
        source: Box<BeansError>,
    },

    /// No candidate for a required slot.
    #[error("can not find candidates for '{required}' required by [{}]", .required_by.join(", "))]
    Unresolved {
        required: &'static str,
        required_by: Vec<String>,
    },

    /// A qualifier filtered every candidate away.
    #[error("the specific bean '{qualifier}' of '{required}' required by '{slot}' is not found among [{}]", .candidates.join(", "))]
    QualifierNotFound {
        qualifier: String,
        required: &'static str,
        slot: String,
        candidates: Vec<String>,
    },

    /// More than one candidate for a single-value slot.
    #[error("field '{slot}' can not be injected with multiple candidates [{}]", .candidates.join(", "))]
    Ambiguous { slot: String, candidates: Vec<String> },

    /// Non-lazy dependency cycle.
    #[error("detected cycle dependency {}", .path.join(" -> "))]
    Cycle { path: Vec<String> },

    /// Construction recursed deeper than the supported limit.
    #[error("max construction depth exceeded ({0})")]
    DepthExceeded(usize),

    /// Two candidates resolve to the same key of a map slot.
    #[error("can not inject duplicates '{key}' to the map field '{slot}'")]
    DuplicateMapKey { key: String, slot: String },

    /// Two factories declare the same output type.
    #[error("repeated factory output '{output}' declared by '{first}' and '{second}'")]
    RepeatedFactory {
        output: &'static str,
        first: &'static str,
        second: &'static str,
    },

    /// A lazy slot is bound to a factory output that does not exist yet.
    #[error("lazy injection is not supported of type '{output}' through factory '{factory}' in to '{slot}'")]
    LazyFactory {
        output: &'static str,
        factory: &'static str,
        slot: String,
    },

    /// The factory's production operation failed.
    #[error("factory bean '{factory}' failed to create bean '{output}', {source}")]
    Factory {
        factory: &'static str,
        output: &'static str,
        #[source]
        source: BoxError,
    },

    /// Type downcast failed.
    #[error("type mismatch for: {0}")]
    TypeMismatch(&'static str),

    /// A post-construction hook failed; `chain` lists the bean and its requesters.
    #[error("post construct failed {chain}, {source}")]
    PostConstruct {
        chain: String,
        #[source]
        source: BoxError,
    },

    /// A disposal hook failed.
    #[error("destroy failed for '{bean}', {source}")]
    Destroy {
        bean: String,
        #[source]
        source: BoxError,
    },

    /// A hook panicked; the fault was caught at the bean boundary.
    #[error("bean '{bean}' panicked during {stage}: {message}")]
    Panicked {
        bean: String,
        stage: &'static str,
        message: String,
    },

    /// Reload was requested on a factory-produced bean.
    #[error("reload is not supported for '{bean}', its instance is owned by factory '{factory}'")]
    Reload { bean: String, factory: &'static str },

    /// Runtime injection found a candidate that is not initialized.
    #[error("field '{slot}' can not be injected with non-initialized bean '{bean}'")]
    NotInitialized { slot: String, bean: String },

    /// The container was dropped while a handle still referenced it.
    #[error("container of '{0}' is no longer available")]
    ContextGone(String),

    /// Container configuration could not be loaded.
    #[error("invalid container configuration: {0}")]
    Config(String),

    /// Several errors collected from one pass (destruction).
    #[error("multiple errors, [{}]", .0.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; "))]
    Multiple(Vec<BeansError>),
}

impl BeansError {
    /// Combines collected errors: none is `Ok`, one is itself, more are `Multiple`.
    pub fn combine(mut errors: Vec<BeansError>) -> BeansResult<()> {
        match errors.len() {
            0 => Ok(()),
            1 => Err(errors.remove(0)),
            _ => Err(BeansError::Multiple(errors)),
        }
    }

    /// The innermost error, looking through `Scan` wrappers.
    pub fn root(&self) -> &BeansError {
        match self {
            BeansError::Scan { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Result type for container operations.
pub type BeansResult<T> = Result<T, BeansError>;
