//! Reference inclusion rules.
//!
//! Exclusion dominates inclusion. Within each stage the first matching rule
//! decides, and a task without any inclusion rule keeps everything that is not
//! excluded.

use crate::task::SyncRepoTask;

/// Decides whether a reference survives the mirror.
///
/// The rules are evaluated in this order:
///
/// 1. exact exclusion (`exclude_ref`)
/// 2. pattern exclusion (`exclude_ref_patterns`)
/// 3. exact inclusion (`include_ref`)
/// 4. pattern inclusion (`include_ref_patterns`)
/// 5. default-allow when no inclusion rule exists at all
///
/// # Example
///
/// ```
/// use syncer_core::{is_ref_included, SyncRepoTask};
///
/// let task = SyncRepoTask::builder()
///     .source("a")
///     .target("b")
///     .exclude_ref_pattern("refs/heads/tmp.*")
///     .build()
///     .unwrap();
///
/// assert!(is_ref_included("refs/heads/main", &task));
/// assert!(!is_ref_included("refs/heads/tmp1", &task));
/// ```
pub fn is_ref_included(ref_path: &str, task: &SyncRepoTask) -> bool {
    if task.exclude_ref().contains(ref_path) {
        return false;
    }

    if task
        .exclude_ref_patterns()
        .iter()
        .any(|pattern| pattern.matches(ref_path))
    {
        return false;
    }

    if task.include_ref().contains(ref_path) {
        return true;
    }

    if task
        .include_ref_patterns()
        .iter()
        .any(|pattern| pattern.matches(ref_path))
    {
        return true;
    }

    task.includes_everything()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn task() -> crate::task::SyncRepoTaskBuilder {
        SyncRepoTask::builder().source("a").target("b")
    }

    #[test]
    fn test_default_allow() {
        let task = task().build().unwrap();
        assert!(is_ref_included("refs/heads/main", &task));
        assert!(is_ref_included("refs/tags/v1.0.0", &task));
        assert!(is_ref_included("refs/pull/1/head", &task));
    }

    #[test]
    fn test_exact_exclude() {
        let task = task().exclude_ref("refs/heads/secret").build().unwrap();
        assert!(!is_ref_included("refs/heads/secret", &task));
        assert!(is_ref_included("refs/heads/secret2", &task));
    }

    #[test]
    fn test_pattern_exclude() {
        let task = task().exclude_ref_pattern("refs/heads/tmp.*").build().unwrap();
        assert!(is_ref_included("refs/heads/main", &task));
        assert!(!is_ref_included("refs/heads/tmp1", &task));
        assert!(!is_ref_included("refs/heads/tmp", &task));
    }

    #[test]
    fn test_exact_include_restricts() {
        let task = task().include_ref("refs/heads/main").build().unwrap();
        assert!(is_ref_included("refs/heads/main", &task));
        assert!(!is_ref_included("refs/heads/develop", &task));
    }

    #[test]
    fn test_pattern_include_restricts() {
        let task = task().include_ref_pattern("refs/tags/").build().unwrap();
        assert!(is_ref_included("refs/tags/v1", &task));
        assert!(!is_ref_included("refs/heads/main", &task));
    }

    #[test]
    fn test_exclude_wins_over_exact_include() {
        let task = task()
            .include_ref("refs/heads/main")
            .exclude_ref("refs/heads/main")
            .build()
            .unwrap();
        assert!(!is_ref_included("refs/heads/main", &task));
    }

    #[test]
    fn test_exclude_pattern_wins_over_include_pattern() {
        let task = task()
            .include_ref_pattern("refs/heads/.*")
            .exclude_ref_pattern("refs/heads/wip/")
            .build()
            .unwrap();
        assert!(is_ref_included("refs/heads/main", &task));
        assert!(!is_ref_included("refs/heads/wip/feature", &task));
    }

    #[test]
    fn test_includes_shorthand() {
        let task = task().exclude_ref("refs/heads/x").build().unwrap();
        assert!(task.includes("refs/heads/y"));
        assert!(!task.includes("refs/heads/x"));
    }

    proptest! {
        /// **Property: Exclusion dominates inclusion**
        /// An excluded path is never included, whatever the include rules say.
        #[test]
        fn prop_exact_exclusion_dominates(name in "[a-z][a-z0-9_-]{0,20}") {
            let path = format!("refs/heads/{}", name);
            let task = task()
                .include_ref(path.clone())
                .include_ref_pattern("refs/.*")
                .exclude_ref(path.clone())
                .build()
                .unwrap();
            prop_assert!(!is_ref_included(&path, &task));
        }

        /// **Property: Pattern exclusion dominates inclusion**
        #[test]
        fn prop_pattern_exclusion_dominates(name in "[a-z][a-z0-9_-]{0,20}") {
            let path = format!("refs/heads/tmp{}", name);
            let task = task()
                .include_ref(path.clone())
                .exclude_ref_pattern("refs/heads/tmp")
                .build()
                .unwrap();
            prop_assert!(!is_ref_included(&path, &task));
        }

        /// **Property: Default-allow**
        /// Without include rules, every path that is not excluded is kept.
        #[test]
        fn prop_default_allow(path in "refs/[a-z]{1,8}/[a-zA-Z0-9_./-]{1,30}") {
            let task = task().exclude_ref("refs/never/used").build().unwrap();
            prop_assert!(is_ref_included(&path, &task));
        }
    }
}
