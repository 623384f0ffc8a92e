use proptest::prelude::*;
use runwatch::discovery::RunIdMatcher;

proptest! {
    #[test]
    fn generated_miseq_ids_match(
        date in "[0-9]{6}",
        instrument in "[0-9]{5}",
        counter in "[0-9]{1,4}",
        flowcell in "[0-9]{9}",
        suffix in "[A-Z0-9]{5}",
    ) {
        let m = RunIdMatcher::new().unwrap();
        let id = format!("{date}_M{instrument}_{counter}_{flowcell}-{suffix}");
        prop_assert!(m.is_match(&id));
    }

    #[test]
    fn generated_nextseq_ids_match(
        date in "[0-9]{6}",
        instrument in "[0-9]{5}",
        counter in "[0-9]{1,4}",
        flowcell in "[A-Z0-9]{9}",
    ) {
        let m = RunIdMatcher::new().unwrap();
        let id = format!("{date}_VH{instrument}_{counter}_{flowcell}");
        prop_assert!(m.is_match(&id));
    }

    #[test]
    fn names_not_starting_with_a_date_never_match(name in "[a-zA-Z_][a-zA-Z0-9_-]{0,40}") {
        let m = RunIdMatcher::new().unwrap();
        prop_assert!(!m.is_match(&name));
    }
}
