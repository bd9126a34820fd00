// Filter & pagination engine.
// The filtered, pre-pagination set feeds the dashboard; the page window feeds the table.

use crate::error::ValidationError;
use crate::types::{
    FilterCriteria, PaginationCursor, RebateTask, TaskPage, TaskRow, MAX_ITEMS_PER_PAGE,
};

/// Sentinel the presentation layer sends for "every project".
pub const ALL_PROJECTS: &str = "all";

fn project_matches(task: &RebateTask, project_id: Option<&str>) -> bool {
    match project_id.map(str::trim) {
        None | Some("") | Some(ALL_PROJECTS) => true,
        Some(id) => task.project_id == id,
    }
}

fn name_matches(task: &RebateTask, needle: Option<&str>) -> bool {
    match crate::util::non_blank(needle) {
        None => true,
        Some(needle) => task
            .talent_name
            .to_lowercase()
            .contains(&needle.to_lowercase()),
    }
}

pub fn matches_filter(task: &RebateTask, criteria: &FilterCriteria) -> bool {
    project_matches(task, criteria.project_id.as_deref())
        && criteria
            .status_class
            .map_or(true, |class| class.matches(task.state()))
        && name_matches(task, criteria.talent_name.as_deref())
}

/// Apply the criteria, keeping insertion order.
pub fn filter_tasks<'a>(tasks: &'a [RebateTask], criteria: &FilterCriteria) -> Vec<&'a RebateTask> {
    tasks.iter().filter(|t| matches_filter(t, criteria)).collect()
}

/// Number of pages for `count` items. An empty set still has one (empty) page.
pub fn total_pages(count: usize, items_per_page: usize) -> usize {
    count.div_ceil(items_per_page.max(1)).max(1)
}

/// Clamp a requested page into `1..=total_pages`.
pub fn clamp_page(page: usize, total_pages: usize) -> usize {
    page.clamp(1, total_pages.max(1))
}

/// Slice the filtered set into the cursor's page. The cursor page is clamped.
pub fn page_window(filtered: &[&RebateTask], cursor: &PaginationCursor) -> TaskPage {
    let total_count = filtered.len();
    let total_pages = total_pages(total_count, cursor.items_per_page);
    let page = clamp_page(cursor.current_page, total_pages);
    let per_page = cursor.items_per_page.max(1);

    let tasks = filtered
        .iter()
        .skip((page - 1) * per_page)
        .take(per_page)
        .map(|t| TaskRow {
            task: (*t).clone(),
            state: t.state(),
        })
        .collect();

    TaskPage {
        tasks,
        page,
        total_pages,
        total_count,
    }
}

pub fn validate_items_per_page(items_per_page: usize) -> Result<usize, ValidationError> {
    if (1..=MAX_ITEMS_PER_PAGE).contains(&items_per_page) {
        Ok(items_per_page)
    } else {
        Err(ValidationError::InvalidInput(format!(
            "items per page must be between 1 and {}, got {}",
            MAX_ITEMS_PER_PAGE, items_per_page
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_utils::{recovered_task, task};
    use crate::types::StatusClass;

    fn sample() -> Vec<RebateTask> {
        vec![
            task("c1", "p1", "Mia Chen", 100.0),
            recovered_task("c2", 100.0, 100.0),
            recovered_task("c3", 100.0, 80.0),
            task("c4", "p2", "MIA Lopez", 100.0),
            task("c5", "p2", "Leo", 100.0),
        ]
    }

    fn ids(tasks: &[&RebateTask]) -> Vec<String> {
        tasks.iter().map(|t| t.id.clone()).collect()
    }

    #[test]
    fn test_empty_criteria_keeps_everything_in_order() {
        let tasks = sample();
        let out = filter_tasks(&tasks, &FilterCriteria::default());
        assert_eq!(ids(&out), vec!["c1", "c2", "c3", "c4", "c5"]);
    }

    #[test]
    fn test_project_filter_exact_or_all() {
        let tasks = sample();
        let mut criteria = FilterCriteria {
            project_id: Some("p2".to_string()),
            ..Default::default()
        };
        assert_eq!(ids(&filter_tasks(&tasks, &criteria)), vec!["c4", "c5"]);

        criteria.project_id = Some(ALL_PROJECTS.to_string());
        assert_eq!(filter_tasks(&tasks, &criteria).len(), 5);

        criteria.project_id = Some("p".to_string());
        assert!(filter_tasks(&tasks, &criteria).is_empty());
    }

    #[test]
    fn test_status_filter_uses_classifier() {
        let tasks = sample();
        let by = |class| {
            let criteria = FilterCriteria {
                status_class: Some(class),
                ..Default::default()
            };
            ids(&filter_tasks(&tasks, &criteria))
        };
        assert_eq!(by(StatusClass::Pending), vec!["c1", "c4", "c5"]);
        assert_eq!(by(StatusClass::Recovered), vec!["c2"]);
        assert_eq!(by(StatusClass::Discrepancy), vec!["c3"]);
    }

    #[test]
    fn test_name_filter_case_insensitive_substring() {
        let tasks = sample();
        let criteria = FilterCriteria {
            talent_name: Some("  mia ".to_string()),
            ..Default::default()
        };
        // recovered_task fixtures are also named "Mia".
        assert_eq!(
            ids(&filter_tasks(&tasks, &criteria)),
            vec!["c1", "c2", "c3", "c4"]
        );
    }

    #[test]
    fn test_total_pages() {
        assert_eq!(total_pages(0, 15), 1);
        assert_eq!(total_pages(15, 15), 1);
        assert_eq!(total_pages(16, 15), 2);
        assert_eq!(total_pages(31, 15), 3);
    }

    #[test]
    fn test_page_window_clamps_past_end() {
        let tasks = sample();
        let filtered = filter_tasks(&tasks, &FilterCriteria::default());
        let cursor = PaginationCursor {
            current_page: 9,
            items_per_page: 2,
        };
        let page = page_window(&filtered, &cursor);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.total_count, 5);
        assert_eq!(page.tasks.len(), 1);
        assert_eq!(page.tasks[0].task.id, "c5");
    }

    #[test]
    fn test_page_window_carries_state() {
        let tasks = sample();
        let filtered = filter_tasks(&tasks, &FilterCriteria::default());
        let cursor = PaginationCursor {
            current_page: 1,
            items_per_page: 3,
        };
        let page = page_window(&filtered, &cursor);
        assert_eq!(
            page.tasks.iter().map(|r| r.state).collect::<Vec<_>>(),
            vec![
                crate::classifier::RecoveryState::NotRecovered,
                crate::classifier::RecoveryState::RecoveredMatched,
                crate::classifier::RecoveryState::RecoveredWithDiscrepancy,
            ]
        );
    }

    #[test]
    fn test_validate_items_per_page() {
        assert_eq!(validate_items_per_page(15), Ok(15));
        assert!(validate_items_per_page(0).is_err());
        assert!(validate_items_per_page(101).is_err());
    }
}
