use super::ScanMode;
use crate::ir::Parameter;

/// Finds bind parameters outside quotes and comments.
///
/// `$N` parameters keep their number as position and are reported once per
/// number. Each anonymous `?` gets the next ordinal.
pub fn extract_parameters(sql: &str) -> Vec<Parameter> {
    let chars: Vec<char> = sql.chars().collect();
    let mut params: Vec<Parameter> = Vec::new();
    let mut anonymous = 0;
    let mut mode = ScanMode::Normal;
    let mut i = 0;
    while i < chars.len() {
        let step = mode.step(&chars, i);
        if mode != ScanMode::Normal || step.next != ScanMode::Normal {
            i += step.len;
            mode = step.next;
            continue;
        }

        let follows_word = i > 0 && is_word_char(chars[i - 1]);
        match chars[i] {
            '$' if !follows_word => {
                let digits = chars[i + 1..]
                    .iter()
                    .take_while(|c| c.is_ascii_digit())
                    .count();
                if digits > 0 {
                    let raw: String = chars[i..=i + digits].iter().collect();
                    if let Ok(position) = raw[1..].parse::<usize>() {
                        if !params.iter().any(|p| p.raw == raw) {
                            params.push(Parameter { raw, position });
                        }
                    }
                    i += digits + 1;
                    continue;
                }
            }
            // `?|` and `?&` are jsonb operators.
            '?' if !matches!(chars.get(i + 1), Some('|' | '&')) => {
                anonymous += 1;
                params.push(Parameter {
                    raw: "?".to_owned(),
                    position: anonymous,
                });
            }
            _ => {}
        }
        i += 1;
    }
    params
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::extract_parameters;
    use crate::ir::Parameter;

    fn param(raw: &str, position: usize) -> Parameter {
        Parameter {
            raw: raw.to_owned(),
            position,
        }
    }

    #[test]
    fn positional() {
        assert_eq!(
            extract_parameters("SELECT * FROM t WHERE a = $1 AND b = $2 OR a = $1"),
            vec![param("$1", 1), param("$2", 2)]
        );
    }

    #[test]
    fn anonymous() {
        assert_eq!(
            extract_parameters("INSERT INTO t VALUES (?, ?)"),
            vec![param("?", 1), param("?", 2)]
        );
    }

    #[test]
    fn ignores_quotes_comments_and_operators() {
        assert_eq!(
            extract_parameters(
                "SELECT '$1', \"$2\", $$ $3 $$, a$4 -- $5\n, \
                 data ?| array['x'] /* ? */ FROM t WHERE id = $6"
            ),
            vec![param("$6", 6)]
        );
    }
}
