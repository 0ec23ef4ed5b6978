//! # Layout Job Validation
//!
//! Structural check of a raw JSON job before anything is deserialized or
//! rendered. The schema is a small rule tree built once per process and
//! shared through [`LayoutValidator::shared`].
//!
//! Every problem is collected, not just the first, and reported as a
//! [`Violation`] with a slash-separated path:
//!
//! ```text
//! - canvas/width: width is fixed by the printer and cannot be set
//! - layers/0: exactly one of 'text' or 'text_file' is required
//! - output/threshold: 300 is greater than the maximum of 255
//! ```

use std::sync::OnceLock;

use serde_json::{Map, Value};

use super::color::parse_color;
use crate::error::{PhomemoError, Violation};
use crate::printer::{MAX_CANVAS_HEIGHT, MAX_FONT_SIZE, MAX_LENGTH_DOTS};

/// One node of the schema.
#[derive(Debug)]
enum Rule {
    /// Anything goes (reserved keys such as `emoji`).
    Any,
    Bool,
    Integer { min: Option<i64>, max: Option<i64> },
    Number { min: Option<f64>, max: Option<f64> },
    /// A non-empty string.
    Text,
    /// Any string, including empty.
    String,
    Enum(&'static [&'static str]),
    Color,
    Array { items: Box<Rule>, min_items: usize },
    Object(ObjectRule),
    /// Object whose shape is picked by a string tag field.
    Tagged {
        tag: &'static str,
        variants: Vec<(&'static str, ObjectRule)>,
    },
    /// Accept the value if any alternative accepts it.
    AnyOf(Vec<Rule>),
}

#[derive(Debug, Default)]
struct ObjectRule {
    fields: Vec<Field>,
    /// Keys that must not appear, with the reason.
    forbidden: Vec<(&'static str, &'static str)>,
    /// Exactly one of these two keys must be present.
    exactly_one: Option<(&'static str, &'static str)>,
}

#[derive(Debug)]
struct Field {
    name: &'static str,
    rule: Rule,
    required: bool,
}

impl ObjectRule {
    fn field(mut self, name: &'static str, rule: Rule) -> Self {
        self.fields.push(Field {
            name,
            rule,
            required: false,
        });
        self
    }

    fn required(mut self, name: &'static str, rule: Rule) -> Self {
        self.fields.push(Field {
            name,
            rule,
            required: true,
        });
        self
    }

    fn forbid(mut self, name: &'static str, reason: &'static str) -> Self {
        self.forbidden.push((name, reason));
        self
    }

    fn exactly_one(mut self, a: &'static str, b: &'static str) -> Self {
        self.exactly_one = Some((a, b));
        self
    }
}

fn int(min: Option<i64>, max: Option<i64>) -> Rule {
    Rule::Integer { min, max }
}

fn number(min: Option<f64>, max: Option<f64>) -> Rule {
    Rule::Number { min, max }
}

fn array(items: Rule, min_items: usize) -> Rule {
    Rule::Array {
        items: Box::new(items),
        min_items,
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "number",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

struct Walker {
    path: Vec<String>,
    violations: Vec<Violation>,
}

impl Walker {
    fn report(&mut self, message: impl Into<String>) {
        self.violations
            .push(Violation::new(self.path.join("/"), message));
    }

    fn nested(&mut self, segment: impl ToString, f: impl FnOnce(&mut Self)) {
        self.path.push(segment.to_string());
        f(self);
        self.path.pop();
    }

    fn check(&mut self, rule: &Rule, value: &Value) {
        match rule {
            Rule::Any => {}
            Rule::Bool => {
                if !value.is_boolean() {
                    self.report(format!("expected boolean, got {}", type_name(value)));
                }
            }
            Rule::Integer { min, max } => {
                let Some(n) = value
                    .as_i64()
                    .map(i128::from)
                    .or_else(|| value.as_u64().map(i128::from))
                else {
                    self.report(format!("expected integer, got {}", type_name(value)));
                    return;
                };
                if let Some(min) = min
                    && n < i128::from(*min)
                {
                    self.report(format!("{} is less than the minimum of {}", n, min));
                }
                if let Some(max) = max
                    && n > i128::from(*max)
                {
                    self.report(format!("{} is greater than the maximum of {}", n, max));
                }
            }
            Rule::Number { min, max } => {
                let Some(n) = value.as_f64() else {
                    self.report(format!("expected number, got {}", type_name(value)));
                    return;
                };
                if let Some(min) = min
                    && n < *min
                {
                    self.report(format!("{} is less than the minimum of {}", n, min));
                }
                if let Some(max) = max
                    && n > *max
                {
                    self.report(format!("{} is greater than the maximum of {}", n, max));
                }
            }
            Rule::Text => match value.as_str() {
                Some("") => self.report("must not be empty"),
                Some(_) => {}
                None => self.report(format!("expected string, got {}", type_name(value))),
            },
            Rule::String => {
                if !value.is_string() {
                    self.report(format!("expected string, got {}", type_name(value)));
                }
            }
            Rule::Enum(options) => match value.as_str() {
                Some(s) if options.contains(&s) => {}
                _ => self.report(format!("{} is not one of {:?}", value, options)),
            },
            Rule::Color => match value.as_str() {
                Some(s) if parse_color(s).is_some() => {}
                Some(s) => self.report(format!("'{}' is not a color", s)),
                None => self.report(format!("expected color string, got {}", type_name(value))),
            },
            Rule::Array { items, min_items } => {
                let Some(array) = value.as_array() else {
                    self.report(format!("expected array, got {}", type_name(value)));
                    return;
                };
                if array.len() < *min_items {
                    self.report(format!(
                        "expected at least {} item(s), got {}",
                        min_items,
                        array.len()
                    ));
                }
                for (i, item) in array.iter().enumerate() {
                    self.nested(i, |w| w.check(items, item));
                }
            }
            Rule::Object(object) => {
                let Some(map) = value.as_object() else {
                    self.report(format!("expected object, got {}", type_name(value)));
                    return;
                };
                self.check_object(object, map, &[]);
            }
            Rule::Tagged { tag, variants } => {
                let Some(map) = value.as_object() else {
                    self.report(format!("expected object, got {}", type_name(value)));
                    return;
                };
                let names: Vec<&str> = variants.iter().map(|(name, _)| *name).collect();
                match map.get(*tag) {
                    None => self.report(format!("'{}' is a required property", tag)),
                    Some(t) => match variants.iter().find(|(name, _)| Some(*name) == t.as_str()) {
                        Some((_, object)) => self.check_object(object, map, &[*tag]),
                        None => self.nested(tag, |w| {
                            w.report(format!("{} is not one of {:?}", t, names))
                        }),
                    },
                }
            }
            Rule::AnyOf(alternatives) => {
                let accepted = alternatives.iter().any(|alt| {
                    let mut trial = Walker {
                        path: Vec::new(),
                        violations: Vec::new(),
                    };
                    trial.check(alt, value);
                    trial.violations.is_empty()
                });
                if !accepted {
                    self.report(format!("{} is not valid under any allowed type", value));
                }
            }
        }
    }

    fn check_object(&mut self, object: &ObjectRule, map: &Map<String, Value>, extra: &[&str]) {
        for field in &object.fields {
            match map.get(field.name) {
                Some(value) => self.nested(field.name, |w| w.check(&field.rule, value)),
                None if field.required => {
                    self.report(format!("'{}' is a required property", field.name))
                }
                None => {}
            }
        }

        for (name, reason) in &object.forbidden {
            if map.contains_key(*name) {
                self.nested(name, |w| w.report(*reason));
            }
        }

        let mut unexpected: Vec<&str> = map
            .keys()
            .map(String::as_str)
            .filter(|k| {
                !extra.contains(k)
                    && !object.fields.iter().any(|f| f.name == *k)
                    && !object.forbidden.iter().any(|(name, _)| name == k)
            })
            .collect();
        unexpected.sort_unstable();
        if !unexpected.is_empty() {
            self.report(format!(
                "additional properties are not allowed ({} unexpected)",
                unexpected
                    .iter()
                    .map(|k| format!("'{}'", k))
                    .collect::<Vec<_>>()
                    .join(", ")
            ));
        }

        if let Some((a, b)) = object.exactly_one {
            let present = |k: &str| map.get(k).is_some_and(|v| !v.is_null());
            if present(a) == present(b) {
                self.report(format!("exactly one of '{}' or '{}' is required", a, b));
            }
        }
    }
}

fn position_rule() -> Rule {
    Rule::Object(
        ObjectRule::default()
            .field("x", int(None, None))
            .field("y", int(None, None)),
    )
}

fn font_fields(object: ObjectRule) -> ObjectRule {
    object
        .field("font_path", Rule::Text)
        .field("fallback_fonts", array(Rule::Text, 0))
        .field("font_size", number(Some(1.0), Some(MAX_FONT_SIZE.into())))
        .field("line_spacing", number(Some(0.0), None))
        .field("wrap_style", Rule::Enum(&["word", "character"]))
        .field("emoji", Rule::Any)
}

fn layout_job_rule() -> Rule {
    let canvas = font_fields(ObjectRule::default())
        .field("height", int(Some(1), Some(MAX_CANVAS_HEIGHT.into())))
        .field("background_color", Rule::Color)
        .field("margin", int(Some(0), Some(MAX_LENGTH_DOTS.into())))
        .forbid("width", "width is fixed by the printer and cannot be set");

    let text = font_fields(ObjectRule::default())
        .field("text", Rule::String)
        .field("text_file", Rule::Text)
        .field("width", int(Some(1), Some(MAX_LENGTH_DOTS.into())))
        .field("align", Rule::Enum(&["left", "center", "right"]))
        .field(
            "stroke",
            Rule::Object(
                ObjectRule::default()
                    .field("width", number(Some(0.0), None))
                    .field("color", Rule::Color),
            ),
        )
        .field("position", position_rule())
        .exactly_one("text", "text_file");

    let image = ObjectRule::default()
        .required("path", Rule::Text)
        .field("scale", number(Some(0.0), None))
        .field("max_width", number(Some(1.0), None))
        .field("max_height", number(Some(1.0), None))
        .field("opacity", number(Some(0.0), Some(1.0)))
        .field("position", position_rule());

    let output = ObjectRule::default()
        .field("threshold", int(Some(0), Some(255)))
        .field("slice_height", int(Some(1), None))
        // Range is enforced by the raster encoder
        .field("chunk_rows", int(None, None))
        .field(
            "rotate",
            Rule::AnyOf(vec![Rule::String, Rule::Bool, int(None, None)]),
        )
        .field("path", Rule::Text)
        .field("send_to_printer", Rule::Bool);

    Rule::Object(
        ObjectRule::default()
            .required("canvas", Rule::Object(canvas))
            .required(
                "layers",
                array(
                    Rule::Tagged {
                        tag: "type",
                        variants: vec![("text", text), ("image", image)],
                    },
                    1,
                ),
            )
            .field("output", Rule::Object(output)),
    )
}

/// Checks raw job documents against the layout job schema.
#[derive(Debug)]
pub struct LayoutValidator {
    root: Rule,
}

impl LayoutValidator {
    pub fn new() -> Self {
        Self {
            root: layout_job_rule(),
        }
    }

    /// The process-wide instance, built on first use.
    pub fn shared() -> &'static LayoutValidator {
        static SHARED: OnceLock<LayoutValidator> = OnceLock::new();
        SHARED.get_or_init(LayoutValidator::new)
    }

    /// All violations, sorted by path. Empty means valid.
    pub fn check(&self, document: &Value) -> Vec<Violation> {
        let mut walker = Walker {
            path: Vec::new(),
            violations: Vec::new(),
        };
        walker.check(&self.root, document);
        walker.violations.sort_by(|a, b| a.path.cmp(&b.path));
        walker.violations
    }

    pub fn validate(&self, document: &Value) -> Result<(), PhomemoError> {
        let violations = self.check(document);
        if violations.is_empty() {
            Ok(())
        } else {
            Err(PhomemoError::Validation(violations))
        }
    }
}

impl Default for LayoutValidator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn paths(document: &Value) -> Vec<String> {
        LayoutValidator::shared()
            .check(document)
            .into_iter()
            .map(|v| v.path)
            .collect()
    }

    fn valid_job() -> Value {
        json!({
            "canvas": {"font_path": "font.ttf", "margin": 10, "emoji": {"source": "google"}},
            "layers": [
                {"type": "text", "text": "Hello", "align": "center",
                 "stroke": {"width": 2, "color": "#000"}, "position": {"x": 0, "y": 5}},
                {"type": "image", "path": "logo.png", "max_width": 300, "opacity": 0.5}
            ],
            "output": {"threshold": 140, "rotate": "cw90", "send_to_printer": false}
        })
    }

    #[test]
    fn test_valid_job_passes() {
        assert_eq!(LayoutValidator::shared().check(&valid_job()), vec![]);
        assert!(LayoutValidator::shared().validate(&valid_job()).is_ok());
    }

    #[test]
    fn test_shared_is_one_instance() {
        assert!(std::ptr::eq(LayoutValidator::shared(), LayoutValidator::shared()));
    }

    #[test]
    fn test_root_must_be_object() {
        let violations = LayoutValidator::shared().check(&json!([1, 2]));
        assert_eq!(violations, vec![Violation::new("", "expected object, got array")]);
        assert_eq!(violations[0].path, "(root)");
    }

    #[test]
    fn test_missing_sections() {
        let violations = LayoutValidator::shared().check(&json!({}));
        assert_eq!(
            violations,
            vec![
                Violation::new("", "'canvas' is a required property"),
                Violation::new("", "'layers' is a required property"),
            ]
        );
    }

    #[test]
    fn test_canvas_width_rejected() {
        let mut job = valid_job();
        job["canvas"]["width"] = json!(384);
        assert_eq!(paths(&job), vec!["canvas/width"]);
    }

    #[test]
    fn test_empty_layers_rejected() {
        let mut job = valid_job();
        job["layers"] = json!([]);
        assert_eq!(paths(&job), vec!["layers"]);
    }

    #[test]
    fn test_text_source_exactly_one() {
        let mut job = valid_job();
        job["layers"][0] = json!({"type": "text"});
        assert_eq!(paths(&job), vec!["layers/0"]);

        job["layers"][0] = json!({"type": "text", "text": "a", "text_file": "b.txt"});
        assert_eq!(paths(&job), vec!["layers/0"]);

        job["layers"][0] = json!({"type": "text", "text_file": "b.txt"});
        assert!(paths(&job).is_empty());
    }

    #[test]
    fn test_unknown_layer_type() {
        let mut job = valid_job();
        job["layers"][1] = json!({"type": "qr", "data": "x"});
        let violations = LayoutValidator::shared().check(&job);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "layers/1/type");
    }

    #[test]
    fn test_collects_all_violations_sorted() {
        let job = json!({
            "canvas": {"margin": -1, "wrap_style": "hyphen", "background_color": "#12"},
            "layers": [{"type": "image", "opacity": 2, "bogus": true}],
            "output": {"threshold": 256, "send_to_printer": "yes"}
        });
        assert_eq!(
            paths(&job),
            vec![
                "canvas/background_color",
                "canvas/margin",
                "canvas/wrap_style",
                "layers/0",
                "layers/0",
                "layers/0/opacity",
                "output/send_to_printer",
                "output/threshold",
            ]
        );
    }

    #[test]
    fn test_rotate_accepts_scalars() {
        let mut job = valid_job();
        for rotate in [json!("anything"), json!(false), json!(0)] {
            job["output"]["rotate"] = rotate;
            assert!(paths(&job).is_empty());
        }
        job["output"]["rotate"] = json!({"deg": 90});
        assert_eq!(paths(&job), vec!["output/rotate"]);
    }

    #[test]
    fn test_sizes_are_bounded() {
        let mut job = valid_job();
        job["canvas"]["height"] = json!(4_000_000_000u64);
        job["canvas"]["margin"] = json!(3_000_000_000u64);
        job["canvas"]["font_size"] = json!(1e9);
        job["layers"][0]["width"] = json!(u64::MAX);
        assert_eq!(
            paths(&job),
            vec!["canvas/font_size", "canvas/height", "canvas/margin", "layers/0/width"]
        );

        let violations = LayoutValidator::shared().check(&job);
        assert!(violations[2].message.contains("3000000000 is greater than the maximum"));
    }

    #[test]
    fn test_chunk_rows_range_left_to_encoder() {
        let mut job = valid_job();
        for rows in [json!(-1), json!(0), json!(257), json!(u64::MAX)] {
            job["output"]["chunk_rows"] = rows;
            assert!(paths(&job).is_empty());
        }
        job["output"]["chunk_rows"] = json!("200");
        assert_eq!(paths(&job), vec!["output/chunk_rows"]);
    }

    #[test]
    fn test_validation_error_message() {
        let mut job = valid_job();
        job["output"]["threshold"] = json!(300);
        let err = LayoutValidator::shared().validate(&job).unwrap_err();
        assert_eq!(
            err.to_string(),
            "layout job schema validation failed:\n- output/threshold: 300 is greater than the maximum of 255"
        );
    }
}
