use regex::Regex;
use std::{collections::HashMap, sync::LazyLock};

// From https://dashif.org/docs/DASH-IF-IOP-v4.3.pdf: only the four identifiers
// below are recognized, and the only printf-style format permitted is
// %0[width]d, so plain string replacement is enough.
//
// Example template: "$RepresentationID$/$Number%06d$.m4s"
static TEMPLATE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$(RepresentationID|Number|Time|Bandwidth)(?:%0(\d)d)?\$").unwrap()
});

/// Substitution values for one representation's URL templates. Tokens with no
/// value set, and tokens outside the four recognized identifiers, are left in
/// the output untouched.
#[derive(Default)]
pub struct Template {
    args: HashMap<&'static str, String>,
}

impl Template {
    pub const REPRESENTATION_ID: &'static str = "RepresentationID";
    pub const NUMBER: &'static str = "Number";
    pub const TIME: &'static str = "Time";
    pub const BANDWIDTH: &'static str = "Bandwidth";

    pub fn new() -> Self {
        Self {
            args: HashMap::with_capacity(4),
        }
    }

    pub fn insert(&mut self, key: &'static str, value: String) {
        self.args.insert(key, value);
    }

    /// Whether `template` references the given identifier, with or without a
    /// width modifier. Resolution uses this to fail fast when a template needs
    /// a value nobody supplied.
    pub fn references(template: &str, key: &str) -> bool {
        TEMPLATE_REGEX
            .captures_iter(template)
            .any(|caps| &caps[1] == key)
    }

    pub fn resolve(&self, template: &str) -> String {
        TEMPLATE_REGEX
            .replace_all(template, |caps: &regex::Captures| {
                let Some(value) = self.args.get(&caps[1]) else {
                    return caps[0].to_string();
                };
                match caps.get(2) {
                    Some(width) => {
                        // The regex only admits a single digit here.
                        let width: usize = width.as_str().parse().unwrap();
                        format!("{value:0>width$}")
                    }
                    None => value.clone(),
                }
            })
            .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::Template;

    fn template() -> Template {
        let mut template = Template::new();
        template.insert(Template::REPRESENTATION_ID, "video-1".to_string());
        template.insert(Template::BANDWIDTH, "800000".to_string());
        template.insert(Template::NUMBER, "7".to_string());
        template.insert(Template::TIME, "1920".to_string());
        template
    }

    #[test]
    fn test_resolve_plain() {
        let template = template();
        assert_eq!(
            template.resolve("$RepresentationID$/seg-$Number$.m4s"),
            "video-1/seg-7.m4s"
        );
        assert_eq!(
            template.resolve("$Bandwidth$-$Time$.m4s"),
            "800000-1920.m4s"
        );
    }

    #[test]
    fn test_resolve_zero_padded() {
        let template = template();
        assert_eq!(template.resolve("seg-$Number%03d$.m4s"), "seg-007.m4s");
        assert_eq!(template.resolve("$Time%08d$.m4s"), "00001920.m4s");
        // Value wider than the requested width is not truncated.
        assert_eq!(template.resolve("$Bandwidth%03d$"), "800000");
    }

    #[test]
    fn test_unrecognized_token_untouched() {
        let template = template();
        assert_eq!(template.resolve("$SubNumber$.m4s"), "$SubNumber$.m4s");
    }

    #[test]
    fn test_unset_value_left_in_place() {
        let template = Template::new();
        assert_eq!(template.resolve("seg-$Number$.m4s"), "seg-$Number$.m4s");
        assert_eq!(template.resolve("seg-$Number%05d$.m4s"), "seg-$Number%05d$.m4s");
    }

    #[test]
    fn test_references() {
        assert!(Template::references("seg-$Number$.m4s", Template::NUMBER));
        assert!(Template::references("seg-$Number%04d$.m4s", Template::NUMBER));
        assert!(!Template::references("seg-$Time$.m4s", Template::NUMBER));
        assert!(!Template::references("seg-$SubNumber$.m4s", Template::NUMBER));
        assert!(Template::references("$RepresentationID$/$Time$.m4s", Template::TIME));
    }
}
