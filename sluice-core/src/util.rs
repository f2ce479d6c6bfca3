/// Shortens long queries in error messages and logs.
#[macro_export]
macro_rules! truncate_long {
    ($query:expr) => {{
        let query: &str = &$query;
        let end = query
            .char_indices()
            .nth(497)
            .map(|(i, _)| i)
            .unwrap_or(query.len());
        format!(
            "{}{}",
            query[..end].trim_end(),
            if end < query.len() { "..." } else { "" },
        )
    }};
}

#[cfg(test)]
mod tests {
    #[test]
    fn truncate() {
        assert_eq!(truncate_long!("select 1"), "select 1");
        let long = "x".repeat(600);
        let truncated = truncate_long!(long);
        assert_eq!(truncated.len(), 500);
        assert!(truncated.ends_with("..."));
    }
}
