#![forbid(unsafe_code)]

//! Small HTML building blocks shared by forms and pages.

use std::fmt::Write as _;

pub fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(ch),
        }
    }
    out
}

/// `<select multiple>` sized like the pickers on every wizard step.
pub fn select_multiple(name: &str, choices: &[String], selected: &[String]) -> String {
    let mut out = String::new();
    let _ = write!(
        out,
        r#"<select name="{name}" class="form-control" size="20" id="id_{name}" multiple>"#,
        name = escape(name)
    );
    for choice in choices {
        let value = escape(choice);
        if selected.contains(choice) {
            let _ = write!(out, r#"<option value="{value}" selected>{value}</option>"#);
        } else {
            let _ = write!(out, r#"<option value="{value}">{value}</option>"#);
        }
    }
    out.push_str("</select>");
    out
}

pub fn hidden_inputs(name: &str, values: &[String]) -> String {
    let name = escape(name);
    let mut out = String::new();
    for (index, value) in values.iter().enumerate() {
        let _ = write!(
            out,
            r#"<input type="hidden" name="{name}" value="{}" id="id_{name}_{index}">"#,
            escape(value)
        );
    }
    out
}

pub fn label(for_name: &str, text: &str) -> String {
    format!(
        r#"<label for="id_{}">{}:</label>"#,
        escape(for_name),
        escape(text)
    )
}

pub fn link(href: &str, text: &str) -> String {
    format!(r#"<a href="{}">{}</a>"#, escape(href), escape(text))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape(r#"<b>"A&B"</b>'"#),
            "&lt;b&gt;&quot;A&amp;B&quot;&lt;/b&gt;&#x27;"
        );
    }

    #[test]
    fn select_marks_selected_options() {
        let html = select_multiple(
            "tf",
            &["AR".to_string(), "ATF".to_string()],
            &["AR".to_string()],
        );
        assert!(html.contains(r#"<option value="AR" selected>AR</option>"#));
        assert!(html.contains(r#"<option value="ATF">ATF</option>"#));
        assert!(html.starts_with(r#"<select name="tf" class="form-control" size="20""#));
    }

    #[test]
    fn hidden_inputs_carry_each_value() {
        let html = hidden_inputs("tf", &["AR".to_string(), "ATF".to_string()]);
        assert!(html.contains(r#"<input type="hidden" name="tf" value="AR""#));
        assert!(html.contains(r#"<input type="hidden" name="tf" value="ATF""#));
    }
}
