/// Errors that end a deploy run. Each variant is fatal; nothing here is retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    /// Required inputs that were absent or empty, in resolution order.
    MissingInputs(Vec<String>),
    /// The transfer tool is missing and installing it did not help.
    ToolUnavailable(String),
    /// The transfer tool ran and failed.
    TransferFailed { message: String, stderr: String, command: String },
    /// `$HOME` could not be determined, so there is nowhere to put the key.
    NoHomeDir,
}

impl std::fmt::Display for DeployError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use DeployError::*;
        match self {
            MissingInputs(names) => write!(f, "Missing required inputs: {}", names.join(", ")),
            ToolUnavailable(msg) => write!(f, "rsync install failed: {}", msg),
            TransferFailed { message, .. } => write!(f, "rsync failed: {}", message),
            NoHomeDir => write!(f, "cannot find the user's home directory"),
        }
    }
}

impl std::error::Error for DeployError {}

impl DeployError {
    /// Names of the missing inputs, empty for every other variant.
    pub fn missing_inputs(&self) -> &[String] {
        match self {
            DeployError::MissingInputs(names) => names,
            _ => &[],
        }
    }
}
