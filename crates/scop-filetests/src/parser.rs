//! Test file parsing

use scop_dfg::LiftOptions;

/// A test case extracted from a test file
#[derive(Debug, Clone)]
pub struct TestCase {
    /// Label from the `region` line
    pub label: String,
    /// 1-based line of the `region` line
    pub line: usize,
    /// The extraction record JSON
    pub record_text: String,
    /// Filecheck directives from the comments after the record
    pub expected_text: String,
}

/// A parsed test file
#[derive(Debug, Clone)]
pub struct TestFile {
    /// The test command (`test resolve`, `test lift`)
    pub command: String,
    pub options: LiftOptions,
    pub cases: Vec<TestCase>,
}

fn apply_setting(options: &mut LiftOptions, setting: &str) -> Result<(), String> {
    let (name, value) = match setting.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (setting.trim(), "true"),
    };
    let value = match value {
        "true" => true,
        "false" => false,
        other => return Err(format!("Setting {} expects true or false, got '{}'", name, other)),
    };
    match name {
        "strict_references" => options.strict_references = value,
        "prune_unprofitable" => options.prune_unprofitable = value,
        "roundtrip" => options.roundtrip = value,
        other => return Err(format!("Unknown setting '{}'", other)),
    }
    Ok(())
}

/// Index of the line closing the JSON object opened at `start`.
///
/// Braces inside JSON strings are skipped; isl text is full of them.
fn object_end(lines: &[&str], start: usize) -> Option<usize> {
    let mut depth = 0i32;
    let mut in_string = false;
    let mut escaped = false;
    for (j, line) in lines.iter().enumerate().skip(start) {
        for ch in line.chars() {
            if in_string {
                match ch {
                    _ if escaped => escaped = false,
                    '\\' => escaped = true,
                    '"' => in_string = false,
                    _ => {}
                }
                continue;
            }
            match ch {
                '"' => in_string = true,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(j);
                    }
                }
                _ => {}
            }
        }
    }
    None
}

/// Parse a test file into its command, settings and cases
pub fn parse_test_file(content: &str) -> Result<TestFile, String> {
    let lines: Vec<&str> = content.lines().collect();
    let mut i = 0;

    // Parse test command from header
    let mut command = String::new();
    let mut options = LiftOptions::default();
    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;
        if line.is_empty() || line.starts_with(';') {
            continue;
        }
        if line.starts_with("test ") {
            command = line.to_string();
            break;
        }
        return Err(format!("line {}: expected a test command, found '{}'", i, line));
    }
    if command.is_empty() {
        return Err("No test command found".to_string());
    }

    let mut cases = Vec::new();
    while i < lines.len() {
        let line = lines[i].trim();
        if line.is_empty() || line.starts_with(';') {
            i += 1;
            continue;
        }
        if let Some(setting) = line.strip_prefix("set ") {
            apply_setting(&mut options, setting).map_err(|e| format!("line {}: {}", i + 1, e))?;
            i += 1;
            continue;
        }
        let Some(label) = line.strip_prefix("region") else {
            return Err(format!("line {}: expected 'region', found '{}'", i + 1, line));
        };

        let region_line = i + 1;
        let start = i + 1;
        let end = object_end(&lines, start)
            .ok_or_else(|| format!("line {}: unterminated record", region_line))?;
        let record_text = lines[start..=end].join("\n");

        // Comment lines after the record, with the ';' stripped
        let mut expected = Vec::new();
        i = end + 1;
        while i < lines.len() {
            let line = lines[i].trim();
            if let Some(directive) = line.strip_prefix(';') {
                expected.push(directive.trim().to_string());
            } else if !line.is_empty() {
                break;
            }
            i += 1;
        }

        cases.push(TestCase {
            label: label.trim().to_string(),
            line: region_line,
            record_text,
            expected_text: expected.join("\n"),
        });
    }

    Ok(TestFile {
        command,
        options,
        cases,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILE: &str = r#"
; header comment
test lift
set strict_references
set roundtrip=false

region first
{
    "name": "a",
    "schedule": "{ S[i0] -> [i0] }"
}
; check: graph a
; nextln: scope S

region second
{ "name": "b", "context": "{  :  }" }
; check: graph b
"#;

    #[test]
    fn test_parse_cases() {
        let file = parse_test_file(FILE).unwrap();
        assert_eq!(file.command, "test lift");
        assert!(file.options.strict_references);
        assert!(!file.options.roundtrip);
        assert!(file.options.prune_unprofitable);

        assert_eq!(file.cases.len(), 2);
        let first = &file.cases[0];
        assert_eq!(first.label, "first");
        assert_eq!(first.line, 7);
        assert!(first.record_text.starts_with('{'));
        assert!(first.record_text.ends_with('}'));
        assert_eq!(first.expected_text, "check: graph a\nnextln: scope S");
        assert_eq!(file.cases[1].record_text, r#"{ "name": "b", "context": "{  :  }" }"#);
    }

    #[test]
    fn test_bad_setting() {
        let err = parse_test_file("test lift\nset fast=yes\n").unwrap_err();
        assert!(err.contains("line 2"));
    }

    #[test]
    fn test_unterminated_record() {
        let err = parse_test_file("test lift\nregion r\n{ \"name\": \"r\"\n").unwrap_err();
        assert!(err.contains("unterminated"));
    }
}
