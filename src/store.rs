use crate::error::StoreError;
use crate::models::{DateRange, PersonalBest, WorkoutRecord};

/// Read contract the training-load core consumes
///
/// Implementations own persistence; the core only ever reads.
pub trait TrainingStore {
    /// Workouts for the athlete whose date falls inside `range`
    fn fetch_workouts(&self, user_id: &str, range: DateRange) -> Result<Vec<WorkoutRecord>, StoreError>;

    /// The athlete's maximum heart rate, if known
    fn fetch_user_max_heart_rate(&self, user_id: &str) -> Result<Option<u16>, StoreError>;

    /// Personal bests the athlete achieved inside `range`
    fn fetch_recent_personal_bests(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<PersonalBest>, StoreError>;
}

impl<T: TrainingStore + ?Sized> TrainingStore for &T {
    fn fetch_workouts(&self, user_id: &str, range: DateRange) -> Result<Vec<WorkoutRecord>, StoreError> {
        (**self).fetch_workouts(user_id, range)
    }

    fn fetch_user_max_heart_rate(&self, user_id: &str) -> Result<Option<u16>, StoreError> {
        (**self).fetch_user_max_heart_rate(user_id)
    }

    fn fetch_recent_personal_bests(
        &self,
        user_id: &str,
        range: DateRange,
    ) -> Result<Vec<PersonalBest>, StoreError> {
        (**self).fetch_recent_personal_bests(user_id, range)
    }
}
