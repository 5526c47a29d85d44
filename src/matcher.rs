use chrono::NaiveDate;
use itertools::Itertools;
use log::{debug, info, trace};
use std::collections::HashMap;

use crate::data::{StudentWindow, TimeSlot};
use crate::overlap::resolve_overlap;

/// Looks for one window that every pooled student window shares with a
/// teacher slot.
///
/// Teacher slots are tried in their listed order and the first one that
/// narrows successfully wins. Slots whose date carries no student window are
/// skipped. An empty pool constrains nothing, so the first teacher slot is
/// returned as-is.
pub fn find_perfect_match(
    teacher_availability: &[TimeSlot],
    pool: &[StudentWindow<'_>],
) -> Option<TimeSlot> {
    if pool.is_empty() {
        return teacher_availability.first().cloned();
    }

    let windows_by_date: HashMap<NaiveDate, Vec<&TimeSlot>> =
        pool.iter().map(|w| (w.slot.date, w.slot)).into_group_map();

    for (index, teacher_slot) in teacher_availability.iter().enumerate() {
        let Some(windows) = windows_by_date.get(&teacher_slot.date) else {
            trace!("Teacher slot #{index} ({teacher_slot}) has no student windows on its date");
            continue;
        };

        match resolve_overlap(teacher_slot, windows.iter().copied()) {
            Some((start, end)) => {
                let matched = teacher_slot.with_window(start, end);
                info!(
                    "Teacher slot #{index} satisfies all {} student windows: {matched}",
                    windows.len()
                );
                return Some(matched);
            }
            None => debug!(
                "Teacher slot #{index} ({teacher_slot}) has no common window with {} student windows",
                windows.len()
            ),
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Minutes;
    use chrono::Datelike;

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
    fn empty_pool_returns_first_teacher_slot() {
        let teacher = vec![slot(1, 600, 660), slot(2, 600, 660)];
        assert_eq!(find_perfect_match(&teacher, &[]), Some(teacher[0].clone()));
        assert_eq!(find_perfect_match(&[], &[]), None);
    }

    #[test]
    fn earliest_listed_teacher_slot_wins() {
        let teacher = vec![slot(2, 600, 720), slot(1, 600, 720)];
        let windows = [("a", slot(1, 600, 660)), ("b", slot(2, 630, 720))];
        assert_eq!(
            find_perfect_match(&teacher, &pool(&windows)),
            Some(slot(2, 630, 720))
        );
    }

    #[test]
    fn falls_through_to_later_slots_when_narrowing_fails() {
        let teacher = vec![slot(1, 540, 600), slot(2, 540, 720)];
        let windows = [
            ("a", slot(1, 600, 660)),
            ("a", slot(2, 600, 700)),
            ("b", slot(2, 630, 720)),
        ];
        assert_eq!(
            find_perfect_match(&teacher, &pool(&windows)),
            Some(slot(2, 630, 700))
        );
    }

    #[test]
    fn a_students_own_windows_are_all_required() {
        // Student "a" offers two alternatives on the same date; the second
        // is disjoint from the first and sinks the whole group.
        let teacher = vec![slot(1, 540, 720)];
        let windows = [("a", slot(1, 540, 600)), ("a", slot(1, 660, 720))];
        assert_eq!(find_perfect_match(&teacher, &pool(&windows)), None);
    }
}
