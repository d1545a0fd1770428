use docreflow::classify::{ClassificationState, Role, classify_heading, classify_subheading, detect_table_from_text};

#[cfg(test)]
mod heading_tests {
    use super::*;

    #[test]
    fn test_short_lines_are_headings() {
        for text in ["Executive Summary", "References", "Budget", "Next steps for the team"] {
            assert!(classify_heading(text), "{text:?} should be a heading");
        }
    }

    #[test]
    fn test_classification_is_repeatable() {
        let samples = [
            "Executive Summary",
            "The board approved the revised budget after a long discussion of the risks involved.",
            "III. Delivery",
            "",
        ];
        for text in samples {
            let first = classify_heading(text);
            for _ in 0..10 {
                assert_eq!(classify_heading(text), first);
            }
        }
    }

    #[test]
    fn test_long_prose_is_body() {
        let text = "The board approved the revised budget after a long discussion of the \
                    risks involved and asked for a follow-up report in the spring.";
        assert!(!classify_heading(text));
    }

    #[test]
    fn test_subheading_needs_context_for_nested_numbers() {
        let text = "2.1 How the regional teams were organised during the first phase of work";
        assert!(classify_subheading(text, &[], true));
        assert!(!classify_subheading(text, &[], false));
    }
}

#[cfg(test)]
mod state_tests {
    use super::*;

    #[test]
    fn test_document_walk_assigns_roles() {
        let paragraphs = [
            "Introduction",
            "1.1. Where the programme stands today and what changed since the last review",
            "The programme moved into its second year with most workstreams on track and \
             two of them reporting delays that the steering group is now addressing.",
        ];
        let mut state = ClassificationState::new();
        let roles: Vec<Role> = paragraphs.iter().map(|text| state.advance(text)).collect();
        assert_eq!(roles, vec![Role::Heading, Role::Subheading, Role::Body]);
        assert_eq!(state.recent().len(), 3);
    }
}

#[cfg(test)]
mod table_tests {
    use super::*;

    #[test]
    fn test_comma_table_has_three_columns() {
        let grid = detect_table_from_text("Name, Age, City\nAlice, 30, NYC\nBob, 25, LA")
            .expect("comma separated lines should form a table");
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.row_count(), 3);
        assert_eq!(grid.rows()[0], vec!["Name", "Age", "City"]);
        assert_eq!(grid.rows()[2], vec!["Bob", "25", "LA"]);
    }

    #[test]
    fn test_tab_table() {
        let grid = detect_table_from_text("Quarter\tRevenue\nQ1\t1.2m\nQ2\t1.4m").unwrap();
        assert_eq!(grid.column_count(), 2);
        assert_eq!(grid.rows()[2], vec!["Q2", "1.4m"]);
    }

    #[test]
    fn test_single_column_is_not_a_table() {
        assert!(detect_table_from_text("apples\npears\nplums").is_none());
    }
}
