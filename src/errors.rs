/// Exit code for failures the user can resolve (pending conflict, ambiguous choice, stack boundary)
pub const EXIT_USER_ACTION: u8 = 3;
/// Exit code for corrupt or unusable persisted stack state
pub const EXIT_CORRUPT_STATE: u8 = 4;
/// Exit code for every other failure
pub const EXIT_FAILURE: u8 = 1;

/// Gitstack Error Types
#[derive(Debug, thiserror::Error)]
pub enum StackError {
    /// Git-related errors
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Corrupt or unreadable persisted stack state
    #[error("Stack state error: {0}")]
    State(String),

    /// Branch graph errors
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Navigation errors
    #[error(transparent)]
    Navigation(#[from] NavigationError),

    /// A suspended cascade blocks the requested operation
    #[error("A sync is suspended on a conflict: {0}")]
    CascadePending(String),

    /// Continue/abort requested with nothing suspended
    #[error("No suspended sync found. Nothing to continue or abort.")]
    NoCascade,

    /// Branch management errors
    #[error("Branch error: {0}")]
    Branch(String),

    /// Interactive prompt errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Failures of the branch graph. Raised before any mutation happens.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    #[error("Branch '{0}' is already tracked")]
    DuplicateBranch(String),

    #[error("Parent '{0}' is neither trunk nor a tracked branch")]
    UnknownParent(String),

    #[error("Branch '{0}' is not tracked")]
    UnknownBranch(String),

    #[error("Making '{parent}' the parent of '{branch}' would create a cycle")]
    CycleDetected { branch: String, parent: String },

    #[error("Trunk '{0}' cannot be tracked or given a parent")]
    TrunkNotTrackable(String),
}

/// Failures of a single up/down step through the stack.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NavigationError {
    #[error("Branch '{0}' has no children, already at the top of the stack")]
    AtTopOfStack(String),

    #[error("Already on trunk '{0}', nothing below it")]
    AtBottomOfStack(String),

    #[error("Branch '{branch}' has {} children: {}", candidates.len(), candidates.join(", "))]
    AmbiguousChildren {
        branch: String,
        candidates: Vec<String>,
    },

    #[error("Branch '{0}' is not tracked, use `gst track <parent>` first")]
    NotTracked(String),
}

impl StackError {
    pub fn config<S: Into<String>>(msg: S) -> Self {
        StackError::Config(msg.into())
    }

    pub fn state<S: Into<String>>(msg: S) -> Self {
        StackError::State(msg.into())
    }

    pub fn branch<S: Into<String>>(msg: S) -> Self {
        StackError::Branch(msg.into())
    }

    pub fn validation<S: Into<String>>(msg: S) -> Self {
        StackError::Validation(msg.into())
    }

    pub fn prompt<S: Into<String>>(msg: S) -> Self {
        StackError::Prompt(msg.into())
    }

    /// Whether the user can fix this by acting (resolving a conflict, picking a branch)
    pub fn is_user_resolvable(&self) -> bool {
        matches!(
            self,
            StackError::CascadePending(_) | StackError::Navigation(_) | StackError::Prompt(_)
        )
    }

    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            StackError::State(_) => EXIT_CORRUPT_STATE,
            e if e.is_user_resolvable() => EXIT_USER_ACTION,
            _ => EXIT_FAILURE,
        }
    }
}

pub type Result<T> = std::result::Result<T, StackError>;
