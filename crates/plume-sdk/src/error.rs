use thiserror::Error;

#[derive(Debug, Error)]
pub enum SdkError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("cannot read configuration: {0}")]
    Io(#[from] std::io::Error),

    #[error("no scheduler service configured")]
    NoSchedulerService,

    #[error("relay error: {0}")]
    Relay(#[from] plume_relay::RelayError),

    #[error("save error: {0}")]
    Save(#[from] plume_drafts::SaveError),

    #[error("schedule error: {0}")]
    Schedule(#[from] plume_schedule::ScheduleError),
}

pub type SdkResult<T> = Result<T, SdkError>;
