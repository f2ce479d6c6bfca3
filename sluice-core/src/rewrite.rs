use std::fmt::Write;

/// Native placeholder syntax a backend expects in place of `:name`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// `$1`, `$2`, ... one per occurrence.
    Dollar,
    /// `?` for every occurrence.
    Question,
    /// `?1`, `?2`, ... one per distinct name, repeated names share the number.
    NumberedQuestion,
    /// `:name`, the query is left as is.
    Colon,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RewrittenQuery {
    pub query: String,
    /// Parameter names in order of occurrence, repeated names appear once per occurrence.
    pub names: Vec<String>,
}

impl RewrittenQuery {
    /// Names in order of first occurrence.
    pub fn distinct_names(&self) -> Vec<&str> {
        let mut result: Vec<&str> = Vec::new();
        for name in &self.names {
            if !result.contains(&name.as_str()) {
                result.push(name);
            }
        }
        result
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Normal,
    InQuotes,
    InName,
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replaces the portable `:name` placeholders with the native syntax.
///
/// Text between single quotes is copied untouched, `::` and `:=` are not placeholders and a colon
/// not followed by a name character is kept as is.
pub fn rewrite_named_parameters(query: &str, style: PlaceholderStyle) -> RewrittenQuery {
    let mut result = RewrittenQuery {
        query: String::with_capacity(query.len()),
        names: Vec::new(),
    };
    let mut state = State::Normal;
    let mut name = String::new();
    let mut chars = query.chars().peekable();
    while let Some(c) = chars.next() {
        if state == State::InName {
            if is_name_char(c) {
                name.push(c);
                continue;
            }
            emit_placeholder(&mut result, std::mem::take(&mut name), style);
            state = State::Normal;
        }
        if state == State::InQuotes {
            if c == '\'' {
                state = State::Normal;
            }
            result.query.push(c);
        } else if c == '\'' {
            result.query.push(c);
            state = State::InQuotes;
        } else if c == ':' {
            match chars.peek().copied() {
                Some(next @ (':' | '=')) => {
                    result.query.push(c);
                    result.query.push(next);
                    chars.next();
                }
                Some(next) if is_name_char(next) => state = State::InName,
                _ => result.query.push(c),
            }
        } else {
            result.query.push(c);
        }
    }
    if state == State::InName {
        emit_placeholder(&mut result, name, style);
    }
    result
}

fn emit_placeholder(result: &mut RewrittenQuery, name: String, style: PlaceholderStyle) {
    match style {
        PlaceholderStyle::Dollar => {
            let _ = write!(result.query, "${}", result.names.len() + 1);
        }
        PlaceholderStyle::Question => result.query.push('?'),
        PlaceholderStyle::NumberedQuestion => {
            let distinct = result.distinct_names();
            let index = distinct
                .iter()
                .position(|v| *v == name)
                .unwrap_or(distinct.len())
                + 1;
            let _ = write!(result.query, "?{}", index);
        }
        PlaceholderStyle::Colon => {
            result.query.push(':');
            result.query.push_str(&name);
        }
    }
    result.names.push(name);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dollar() {
        let rewritten = rewrite_named_parameters(
            "select * from t where a = :foo and b = 'x:y' and c = :foo",
            PlaceholderStyle::Dollar,
        );
        assert_eq!(
            rewritten.query,
            "select * from t where a = $1 and b = 'x:y' and c = $2"
        );
        assert_eq!(rewritten.names, ["foo", "foo"]);
        assert_eq!(rewritten.distinct_names(), ["foo"]);
    }

    #[test]
    fn numbered() {
        let rewritten = rewrite_named_parameters(
            "insert into t values(:a, :b, :a, :c)",
            PlaceholderStyle::NumberedQuestion,
        );
        assert_eq!(rewritten.query, "insert into t values(?1, ?2, ?1, ?3)");
        assert_eq!(rewritten.names, ["a", "b", "a", "c"]);
    }

    #[test]
    fn question() {
        let rewritten =
            rewrite_named_parameters("update t set x = :x where id = :id", PlaceholderStyle::Question);
        assert_eq!(rewritten.query, "update t set x = ? where id = ?");
        assert_eq!(rewritten.names, ["x", "id"]);
    }

    #[test]
    fn casts_and_assignments() {
        let rewritten = rewrite_named_parameters(
            "select :v::int, x := 1, a:b, ':q', ': '",
            PlaceholderStyle::Dollar,
        );
        assert_eq!(rewritten.query, "select $1::int, x := 1, a$2, ':q', ': '");
        assert_eq!(rewritten.names, ["v", "b"]);
    }

    #[test]
    fn name_at_end() {
        let rewritten = rewrite_named_parameters("select :last_one", PlaceholderStyle::Colon);
        assert_eq!(rewritten.query, "select :last_one");
        assert_eq!(rewritten.names, ["last_one"]);
        let rewritten = rewrite_named_parameters("select x from t where y = :", PlaceholderStyle::Dollar);
        assert_eq!(rewritten.query, "select x from t where y = :");
        assert!(rewritten.names.is_empty());
    }

    #[test]
    fn escaped_quotes() {
        let rewritten = rewrite_named_parameters(
            "select 'it''s :not' || :yes",
            PlaceholderStyle::Question,
        );
        assert_eq!(rewritten.query, "select 'it''s :not' || ?");
        assert_eq!(rewritten.names, ["yes"]);
    }

    #[test]
    fn ascii_names_only() {
        let rewritten = rewrite_named_parameters("select :abcé, :é", PlaceholderStyle::Dollar);
        assert_eq!(rewritten.query, "select $1é, :é");
        assert_eq!(rewritten.names, ["abc"]);
    }
}
