use itertools::Itertools;
use log::{debug, info, trace};
use serde::Serialize;

use crate::data::{Minutes, StudentWindow, TimeSlot};
use crate::overlap::MIN_WINDOW_MINUTES;

/// Spacing of candidate start and end times inside a teacher slot.
pub const GRID_STEP_MINUTES: Minutes = 15;

/// Best window found when no single window suits everyone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Compromise {
    pub timing: TimeSlot,
    pub students_accommodated: usize,
}

/// Searches a 15-minute grid inside every teacher slot for the window that
/// fits entirely inside the most students' windows.
///
/// Ties keep the first candidate found: earliest teacher slot, then the
/// earliest start, then the shortest window. When nothing is accommodated
/// the first teacher slot is returned unmodified with a count of zero.
/// Returns `None` only when the teacher offered nothing.
///
/// # Panics
///
/// Panics if `pool` holds windows for more distinct students than
/// `total_enrolled`.
pub fn find_compromise(
    teacher_availability: &[TimeSlot],
    pool: &[StudentWindow<'_>],
    total_enrolled: usize,
) -> Option<Compromise> {
    let first_slot = teacher_availability.first()?;
    let pooled_students = pool.iter().map(|w| w.student_id).unique().count();
    assert!(
        pooled_students <= total_enrolled,
        "compromise pool holds {pooled_students} students but only {total_enrolled} are enrolled"
    );

    let mut best = Compromise {
        timing: first_slot.clone(),
        students_accommodated: 0,
    };
    let mut candidates_scanned = 0usize;

    for (index, teacher_slot) in teacher_availability.iter().enumerate() {
        let relevant: Vec<&StudentWindow<'_>> = pool
            .iter()
            .filter(|w| w.slot.date == teacher_slot.date)
            .collect();
        if relevant.is_empty() {
            trace!("Teacher slot #{index} ({teacher_slot}) has no student windows on its date");
            continue;
        }

        for (start, end) in candidate_windows(teacher_slot) {
            candidates_scanned += 1;
            let accommodated = relevant
                .iter()
                .filter(|w| w.slot.start_time <= start && w.slot.end_time >= end)
                .map(|w| w.student_id)
                .unique()
                .count();
            if accommodated > best.students_accommodated {
                best = Compromise {
                    timing: teacher_slot.with_window(start, end),
                    students_accommodated: accommodated,
                };
                debug!(
                    "New best compromise {} accommodating {accommodated} students",
                    best.timing
                );
            }
        }
    }

    info!(
        "Compromise search scanned {candidates_scanned} candidate windows; best {} accommodates {}/{} students",
        best.timing, best.students_accommodated, total_enrolled
    );
    Some(best)
}

/// Candidate `(start, end)` pairs, at least [`MIN_WINDOW_MINUTES`] wide,
/// in start-major order.
fn candidate_windows(slot: &TimeSlot) -> impl Iterator<Item = (Minutes, Minutes)> {
    let (slot_start, slot_end) = (slot.start_time, slot.end_time);
    let step = GRID_STEP_MINUTES as usize;
    let last_start = slot_end.checked_sub(MIN_WINDOW_MINUTES);

    last_start
        .into_iter()
        .flat_map(move |last_start| (slot_start..=last_start).step_by(step))
        .flat_map(move |start| {
            (start + MIN_WINDOW_MINUTES..=slot_end)
                .step_by(step)
                .map(move |end| (start, end))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, NaiveDate};

    fn slot(day: u32, start: Minutes, end: Minutes) -> TimeSlot {
        let date = NaiveDate::from_ymd_opt(2025, 7, day).unwrap();
        TimeSlot {
            date,
            weekday: date.weekday(),
            start_time: start,
            end_time: end,
            timezone: "UTC".to_string(),
        }
    }

    fn pool<'a>(windows: &'a [(&'a str, TimeSlot)]) -> Vec<StudentWindow<'a>> {
        windows
            .iter()
            .map(|(id, slot)| StudentWindow { student_id: *id, slot })
            .collect()
    }

    #[test]
    fn candidate_grid_respects_minimum_width_and_step() {
        let grid: Vec<_> = candidate_windows(&slot(1, 540, 600)).collect();
        assert_eq!(grid, vec![(540, 570), (540, 585), (540, 600), (555, 585), (555, 600), (570, 600)]);
        assert_eq!(candidate_windows(&slot(1, 540, 560)).count(), 0);
        assert_eq!(candidate_windows(&slot(1, 0, 20)).count(), 0);
    }

    #[test]
    fn picks_window_shared_by_two_of_three() {
        let teacher = vec![slot(1, 540, 660)];
        let windows = [
            ("a", slot(1, 540, 600)),
            ("b", slot(1, 570, 630)),
            ("c", slot(1, 630, 660)),
        ];
        let best = find_compromise(&teacher, &pool(&windows), 3).unwrap();
        assert_eq!(best.students_accommodated, 2);
        assert_eq!(best.timing, slot(1, 570, 600));
    }

    #[test]
    fn requires_full_containment_not_overlap() {
        // Each student overlaps every candidate but none contains a 30-minute window.
        let teacher = vec![slot(1, 540, 600)];
        let windows = [("a", slot(1, 500, 560)), ("b", slot(1, 580, 700))];
        let best = find_compromise(&teacher, &pool(&windows), 2).unwrap();
        assert_eq!(best.students_accommodated, 0);
        assert_eq!(best.timing, teacher[0]);
    }

    #[test]
    fn falls_back_to_first_teacher_slot_without_relevant_windows() {
        let teacher = vec![slot(1, 540, 600), slot(2, 600, 660)];
        let windows = [("a", slot(3, 540, 600))];
        let best = find_compromise(&teacher, &pool(&windows), 1).unwrap();
        assert_eq!(best, Compromise { timing: teacher[0].clone(), students_accommodated: 0 });
        assert_eq!(find_compromise(&[], &pool(&windows), 1), None);
    }

    #[test]
    fn ties_keep_the_earliest_teacher_slot() {
        let teacher = vec![slot(2, 600, 660), slot(1, 540, 600)];
        let windows = [("a", slot(1, 540, 600)), ("b", slot(2, 600, 660))];
        let best = find_compromise(&teacher, &pool(&windows), 2).unwrap();
        assert_eq!(best.students_accommodated, 1);
        assert_eq!(best.timing, slot(2, 600, 630));
    }

    #[test]
    fn counts_students_not_windows() {
        let teacher = vec![slot(1, 540, 660)];
        let windows = [
            ("a", slot(1, 540, 660)),
            ("a", slot(1, 540, 600)),
            ("b", slot(1, 600, 660)),
        ];
        let best = find_compromise(&teacher, &pool(&windows), 2).unwrap();
        assert_eq!(best.students_accommodated, 2);
        assert_eq!(best.timing, slot(1, 600, 630));
    }

    #[test]
    #[should_panic(expected = "only 1 are enrolled")]
    fn pool_larger_than_roster_is_a_caller_bug() {
        let teacher = vec![slot(1, 540, 660)];
        let windows = [("a", slot(1, 540, 660)), ("b", slot(1, 540, 660))];
        find_compromise(&teacher, &pool(&windows), 1);
    }
}
