/// Outcome of the last greeting request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GreetingState {
    #[default]
    Idle,
    Loading,
    Success(String),
    Error(String),
}

impl GreetingState {
    pub fn is_loading(&self) -> bool {
        matches!(self, GreetingState::Loading)
    }
}
