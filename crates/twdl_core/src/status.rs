/// Progress notifications for whatever is showing the batch to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusUpdate {
    /// Total number of units of work.
    Count(usize),
    /// Units of work finished so far.
    Index(usize),
    /// Human-readable status line.
    Status(String),
}
