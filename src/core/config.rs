/*!
 * OSAL Configuration
 *
 * Runtime configuration for table capacities, tick rate and lifecycle policy
 */

use super::errors::{OsalError, OsalResult};
use super::id::{ObjectType, MAX_TABLE_INDEX};
use super::limits::*;
use std::time::Duration;

/// Per-type table capacities
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLimits {
    pub max_tasks: usize,
    pub max_queues: usize,
    pub max_bin_semaphores: usize,
    pub max_count_semaphores: usize,
    pub max_mutexes: usize,
    pub max_condvars: usize,
    pub max_rwlocks: usize,
    pub max_timebases: usize,
    pub max_timers: usize,
    pub max_modules: usize,
    pub max_open_files: usize,
    pub max_open_dirs: usize,
    pub max_file_systems: usize,
    pub max_consoles: usize,
}

impl ObjectLimits {
    /// Capacity of the table for `object_type` (0 for Undefined)
    pub fn capacity(&self, object_type: ObjectType) -> usize {
        match object_type {
            ObjectType::Undefined => 0,
            ObjectType::Task => self.max_tasks,
            ObjectType::Queue => self.max_queues,
            ObjectType::CountSem => self.max_count_semaphores,
            ObjectType::BinSem => self.max_bin_semaphores,
            ObjectType::Mutex => self.max_mutexes,
            ObjectType::Stream => self.max_open_files,
            ObjectType::Dir => self.max_open_dirs,
            ObjectType::TimeBase => self.max_timebases,
            ObjectType::TimerCb => self.max_timers,
            ObjectType::Module => self.max_modules,
            ObjectType::FileSys => self.max_file_systems,
            ObjectType::Console => self.max_consoles,
            ObjectType::CondVar => self.max_condvars,
            ObjectType::RwLock => self.max_rwlocks,
        }
    }

    /// Set every table to the same capacity (handy for exhaustion tests)
    pub const fn uniform(capacity: usize) -> Self {
        Self {
            max_tasks: capacity,
            max_queues: capacity,
            max_bin_semaphores: capacity,
            max_count_semaphores: capacity,
            max_mutexes: capacity,
            max_condvars: capacity,
            max_rwlocks: capacity,
            max_timebases: capacity,
            max_timers: capacity,
            max_modules: capacity,
            max_open_files: capacity,
            max_open_dirs: capacity,
            max_file_systems: capacity,
            max_consoles: capacity,
        }
    }
}

impl Default for ObjectLimits {
    fn default() -> Self {
        Self {
            max_tasks: DEFAULT_MAX_TASKS,
            max_queues: DEFAULT_MAX_QUEUES,
            max_bin_semaphores: DEFAULT_MAX_BIN_SEMAPHORES,
            max_count_semaphores: DEFAULT_MAX_COUNT_SEMAPHORES,
            max_mutexes: DEFAULT_MAX_MUTEXES,
            max_condvars: DEFAULT_MAX_CONDVARS,
            max_rwlocks: DEFAULT_MAX_RWLOCKS,
            max_timebases: DEFAULT_MAX_TIMEBASES,
            max_timers: DEFAULT_MAX_TIMERS,
            max_modules: DEFAULT_MAX_MODULES,
            max_open_files: DEFAULT_MAX_OPEN_FILES,
            max_open_dirs: DEFAULT_MAX_OPEN_DIRS,
            max_file_systems: DEFAULT_MAX_FILE_SYSTEMS,
            max_consoles: DEFAULT_MAX_CONSOLES,
        }
    }
}

/// OSAL runtime configuration
#[derive(Debug, Clone)]
pub struct OsalConfig {
    /// System tick rate used for timeout conversion
    pub ticks_per_second: u32,
    /// Maximum object name length in bytes
    pub max_name_len: usize,
    /// Table capacities
    pub limits: ObjectLimits,
    /// Deepest queue that may be created
    pub queue_max_depth: usize,
    /// Bound on waiting for references to drain before a delete gives up
    pub object_wait_timeout: Duration,
    /// Passes made by DeleteAllObjects
    pub delete_all_attempts: u32,
}

impl Default for OsalConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: DEFAULT_TICKS_PER_SECOND,
            max_name_len: DEFAULT_MAX_NAME_LEN,
            limits: ObjectLimits::default(),
            queue_max_depth: DEFAULT_QUEUE_MAX_DEPTH,
            object_wait_timeout: DEFAULT_OBJECT_WAIT_TIMEOUT,
            delete_all_attempts: DEFAULT_DELETE_ALL_ATTEMPTS,
        }
    }
}

impl OsalConfig {
    /// Small tables for exercising capacity limits
    pub fn minimal() -> Self {
        Self {
            limits: ObjectLimits::uniform(4),
            ..Self::default()
        }
    }

    /// Fine-grained ticks for timing-sensitive workloads
    pub fn high_resolution() -> Self {
        Self {
            ticks_per_second: 1000,
            ..Self::default()
        }
    }

    /// Defaults overridden by environment variables
    ///
    /// Environment variables:
    /// - OSAL_TICKS_PER_SECOND
    /// - OSAL_MAX_NAME_LEN
    /// - OSAL_MAX_TASKS, OSAL_MAX_TIMEBASES, OSAL_MAX_TIMERS
    pub fn from_env() -> OsalResult<Self> {
        let mut config = Self::default();

        if let Some(v) = env_number("OSAL_TICKS_PER_SECOND")? {
            config.ticks_per_second = u32::try_from(v).map_err(|_| {
                OsalError::InvalidArgument(format!("OSAL_TICKS_PER_SECOND out of range: {}", v))
            })?;
        }
        if let Some(v) = env_number("OSAL_MAX_NAME_LEN")? {
            config.max_name_len = v;
        }
        if let Some(v) = env_number("OSAL_MAX_TASKS")? {
            config.limits.max_tasks = v;
        }
        if let Some(v) = env_number("OSAL_MAX_TIMEBASES")? {
            config.limits.max_timebases = v;
        }
        if let Some(v) = env_number("OSAL_MAX_TIMERS")? {
            config.limits.max_timers = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Microseconds represented by one system tick
    #[inline]
    pub fn microsec_per_tick(&self) -> u32 {
        1_000_000 / self.ticks_per_second.max(1)
    }

    /// Reject configurations the registry cannot honor
    pub fn validate(&self) -> OsalResult<()> {
        if self.ticks_per_second == 0 || self.ticks_per_second > 1_000_000 {
            return Err(OsalError::InvalidArgument(format!(
                "ticks_per_second must be in 1..=1000000, got {}",
                self.ticks_per_second
            )));
        }
        if self.max_name_len == 0 {
            return Err(OsalError::InvalidArgument(
                "max_name_len must be nonzero".into(),
            ));
        }
        if self.queue_max_depth == 0 {
            return Err(OsalError::InvalidArgument(
                "queue_max_depth must be nonzero".into(),
            ));
        }
        for object_type in ObjectType::ALL {
            let capacity = self.limits.capacity(object_type);
            if capacity == 0 || capacity > MAX_TABLE_INDEX {
                return Err(OsalError::InvalidArgument(format!(
                    "{} table capacity must be in 1..={}, got {}",
                    object_type, MAX_TABLE_INDEX, capacity
                )));
            }
        }
        Ok(())
    }
}

fn env_number(key: &str) -> OsalResult<Option<usize>> {
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|e| OsalError::InvalidArgument(format!("{}: {}", key, e))),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(OsalConfig::default().validate().is_ok());
        assert_eq!(OsalConfig::default().microsec_per_tick(), 10_000);
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let mut config = OsalConfig::default();
        config.limits.max_mutexes = 0;
        assert!(matches!(
            config.validate(),
            Err(OsalError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_capacity_beyond_codec_rejected() {
        let mut config = OsalConfig::default();
        config.limits.max_timers = MAX_TABLE_INDEX + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_presets() {
        assert_eq!(OsalConfig::minimal().limits.capacity(ObjectType::Queue), 4);
        assert_eq!(OsalConfig::high_resolution().microsec_per_tick(), 1000);
    }
}
