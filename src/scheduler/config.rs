//! Scheduler configuration

use std::time::Duration;

use crate::pipeline::RetryPolicy;

/// What to do with a pipeline whose surfaces are all hidden
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuspendPolicy {
    /// Keep decoding, draw nothing; resume is instant
    #[default]
    KeepDecoding,
    /// Stop the session until a surface becomes visible again
    PauseDecoding,
}

/// Opaque information about the host's display, handed to the graphics factory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextInfo {
    /// Native display handle (EGLDisplay, HWND, ...), 0 for the default
    pub display: u64,
    /// Request a debug context
    pub debug: bool,
}

/// Scheduler configuration options
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Maximum number of concurrently live pipelines
    pub max_stream_limit: usize,

    /// Retries allowed per pipeline before the stream is declared dead
    pub max_retry_limit: u32,

    /// Fixed delay before each retry
    pub retry_backoff: Duration,

    /// Grace period between a pipeline losing its last surface and its release
    pub release_debounce: Duration,

    /// Decode output width
    pub frame_width: u32,

    /// Decode output height
    pub frame_height: u32,

    /// Behaviour when every surface of a pipeline is hidden
    pub suspend_policy: SuspendPolicy,

    /// Refresh interval for the built-in interval clock
    pub refresh_interval: Duration,

    /// Host display information for the graphics context
    pub context: ContextInfo,

    /// Arguments passed to the decode engine at creation
    pub engine_args: Vec<String>,

    /// Name of the dedicated scheduler thread
    pub thread_name: String,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_stream_limit: 8,
            max_retry_limit: 5,
            retry_backoff: Duration::from_millis(2000),
            release_debounce: Duration::from_millis(500),
            frame_width: 1280,
            frame_height: 720,
            suspend_policy: SuspendPolicy::KeepDecoding,
            refresh_interval: Duration::from_nanos(16_666_667), // 60 Hz
            context: ContextInfo::default(),
            engine_args: Vec::new(),
            thread_name: "render-scheduler".into(),
        }
    }
}

impl SchedulerConfig {
    /// Set the admission limit
    pub fn max_stream_limit(mut self, limit: usize) -> Self {
        self.max_stream_limit = limit;
        self
    }

    /// Set the retry budget
    pub fn max_retry_limit(mut self, limit: u32) -> Self {
        self.max_retry_limit = limit;
        self
    }

    /// Set the retry backoff
    pub fn retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    /// Set the release debounce window
    pub fn release_debounce(mut self, window: Duration) -> Self {
        self.release_debounce = window;
        self
    }

    /// Set the decode output size
    pub fn frame_size(mut self, width: u32, height: u32) -> Self {
        self.frame_width = width.max(1);
        self.frame_height = height.max(1);
        self
    }

    /// Set the hidden-surface policy
    pub fn suspend_policy(mut self, policy: SuspendPolicy) -> Self {
        self.suspend_policy = policy;
        self
    }

    /// Set the refresh interval
    pub fn refresh_interval(mut self, interval: Duration) -> Self {
        self.refresh_interval = interval;
        self
    }

    /// Set host display information
    pub fn context(mut self, context: ContextInfo) -> Self {
        self.context = context;
        self
    }

    /// Append a decode engine argument
    pub fn engine_arg(mut self, arg: impl Into<String>) -> Self {
        self.engine_args.push(arg.into());
        self
    }

    /// Retry policy handed to each pipeline
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retry_limit,
            backoff: self.retry_backoff,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();

        assert_eq!(config.max_stream_limit, 8);
        assert_eq!(config.max_retry_limit, 5);
        assert_eq!(config.retry_backoff, Duration::from_millis(2000));
        assert_eq!(config.release_debounce, Duration::from_millis(500));
        assert_eq!(config.suspend_policy, SuspendPolicy::KeepDecoding);
        assert!(config.engine_args.is_empty());
    }

    #[test]
    fn test_builder_frame_size_clamped() {
        let config = SchedulerConfig::default().frame_size(0, 0);

        assert_eq!(config.frame_width, 1);
        assert_eq!(config.frame_height, 1);
    }

    #[test]
    fn test_builder_chaining() {
        let config = SchedulerConfig::default()
            .max_stream_limit(2)
            .max_retry_limit(3)
            .retry_backoff(Duration::from_millis(250))
            .release_debounce(Duration::from_millis(100))
            .frame_size(640, 360)
            .suspend_policy(SuspendPolicy::PauseDecoding)
            .engine_arg("--no-audio")
            .engine_arg("--verbose=0");

        assert_eq!(config.max_stream_limit, 2);
        assert_eq!(config.frame_width, 640);
        assert_eq!(config.frame_height, 360);
        assert_eq!(config.suspend_policy, SuspendPolicy::PauseDecoding);
        assert_eq!(config.engine_args, vec!["--no-audio", "--verbose=0"]);

        let policy = config.retry_policy();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.backoff, Duration::from_millis(250));
    }
}
