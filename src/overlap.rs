use crate::data::{Minutes, TimeSlot};

/// Shortest shared window worth scheduling.
pub const MIN_WINDOW_MINUTES: Minutes = 30;

/// Narrows a teacher slot against student windows on the same date.
///
/// Every window must keep the running intersection alive: one disjoint
/// window rejects the whole group, even when it belongs to a student who
/// also offered an overlapping alternative. Returns the shared
/// `(start, end)` when it is at least [`MIN_WINDOW_MINUTES`] long.
pub fn resolve_overlap<'a, I>(teacher_slot: &TimeSlot, windows: I) -> Option<(Minutes, Minutes)>
where
    I: IntoIterator<Item = &'a TimeSlot>,
{
    let mut overlap_start = teacher_slot.start_time;
    let mut overlap_end = teacher_slot.end_time;

    for window in windows {
        if window.start_time >= overlap_end || window.end_time <= overlap_start {
            return None;
        }
        overlap_start = overlap_start.max(window.start_time);
        overlap_end = overlap_end.min(window.end_time);
    }

    (overlap_end - overlap_start >= MIN_WINDOW_MINUTES).then_some((overlap_start, overlap_end))
}
