//! The exclusion report: functions that did not become constructors or
//! methods, with the reasons.

use std::collections::BTreeMap;

use crate::classify::Exclusion;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Report {
    excluded: BTreeMap<String, Vec<Exclusion>>,
    pub classes: usize,
    pub constructors: usize,
    pub factories: usize,
    pub methods: usize,
}

impl Report {
    pub fn exclude(&mut self, function: &str, reason: Exclusion) {
        let reasons = self.excluded.entry(function.to_string()).or_default();
        if !reasons.contains(&reason) {
            reasons.push(reason);
        }
    }

    pub fn reasons(&self, function: &str) -> Option<&[Exclusion]> {
        self.excluded.get(function).map(Vec::as_slice)
    }

    pub fn excluded(&self) -> impl Iterator<Item = (&str, &[Exclusion])> {
        self.excluded.iter().map(|(f, r)| (f.as_str(), r.as_slice()))
    }

    pub fn excluded_count(&self) -> usize {
        self.excluded.len()
    }

    /// Text of `wrap-report.txt`, one `function: reason, reason` line per
    /// function, sorted by name.
    pub fn render(&self) -> String {
        let mut out = format!(
            "# {} classes, {} constructors, {} static factories, {} methods.\n\
             # Functions below are not class constructors or methods.\n",
            self.classes, self.constructors, self.factories, self.methods
        );
        for (function, reasons) in &self.excluded {
            let reasons: Vec<&str> = reasons.iter().map(|r| r.code()).collect();
            out.push_str(&format!("{function}: {}\n", reasons.join(", ")));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_is_sorted() {
        let mut report = Report::default();
        report.exclude("fz_printf", Exclusion::Variadic);
        report.exclude("fz_abs", Exclusion::FirstArgNotStruct);
        report.exclude("fz_abs", Exclusion::FirstArgNotStruct);
        report.exclude("fz_abs", Exclusion::NoExtrasForReturnType);
        let text = report.render();
        let lines: Vec<&str> = text.lines().filter(|l| !l.starts_with('#')).collect();
        assert_eq!(
            lines,
            [
                "fz_abs: first-arg-not-struct, no-extras-for-return-type",
                "fz_printf: variadic"
            ]
        );
        assert_eq!(report.reasons("fz_printf"), Some(&[Exclusion::Variadic][..]));
    }
}
