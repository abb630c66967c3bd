//! Snapshot fixtures.
//!
//! Each `tests/fixtures/*.fixture` file holds one or more PHP units, each
//! introduced by `--- unit ---`, followed by a `--- expect ---` section.
//! The units are registered in order and every declared type is rendered
//! as a member listing that must match the expectation line for line.

use std::fmt::Write as _;

use datatest_stable::Utf8Path;
use phpantom_reflection::{Broker, ClassView};

const UNIT: &str = "--- unit ---";
const EXPECT: &str = "--- expect ---";

fn run_fixture(path: &Utf8Path, content: String) -> datatest_stable::Result<()> {
    let (units, expected) = split_fixture(&content)
        .ok_or_else(|| format!("{path}: missing `{EXPECT}` section"))?;

    let mut broker = Broker::new();
    for (i, unit) in units.iter().enumerate() {
        let file = format!("{}#{}", path.file_name().unwrap_or("fixture"), i);
        broker
            .register_source(unit, Some(&file))
            .map_err(|e| format!("{path}: unit {i}: {e}"))?;
    }

    let actual = render(&broker);
    if actual.trim_end() != expected.trim_end() {
        return Err(format!(
            "{path}: listing differs\n--- expected ---\n{}\n--- actual ---\n{}",
            expected.trim_end(),
            actual.trim_end()
        )
        .into());
    }
    Ok(())
}

fn split_fixture(content: &str) -> Option<(Vec<String>, String)> {
    let (sources, expected) = content.split_once(EXPECT)?;
    let units = sources
        .split(UNIT)
        .map(str::trim)
        .filter(|unit| !unit.is_empty())
        .map(str::to_string)
        .collect();
    Some((units, expected.trim_start_matches('\n').to_string()))
}

fn render(broker: &Broker) -> String {
    let mut out = String::new();
    let classes = match broker.classes() {
        Ok(classes) => classes,
        Err(e) => return format!("error: {e}\n"),
    };
    for class in &classes {
        render_class(&mut out, class);
    }
    out
}

fn render_class(out: &mut String, class: &ClassView<'_>) {
    let kind = class.kind().map(|k| format!("{k:?}").to_lowercase()).unwrap_or_default();
    let _ = writeln!(out, "{kind} {} [{:?}]", class.name(), class.lifecycle());
    for method in class.methods() {
        let _ = writeln!(
            out,
            "  method {} <- {} {:?}{}",
            method.name(),
            method.declaring_class_name(),
            method.visibility(),
            if method.is_abstract() { " abstract" } else { "" }
        );
    }
    for property in class.properties() {
        let _ = writeln!(
            out,
            "  property ${} <- {} {:?}{}",
            property.name(),
            property.declaring_class_name(),
            property.visibility(),
            if property.is_static() { " static" } else { "" }
        );
    }
    for constant in class.constants() {
        let value = match class.constant_value(constant.name()) {
            Ok(value) => value.to_string(),
            Err(e) => format!("error: {e}"),
        };
        let _ = writeln!(out, "  const {} = {}", constant.name(), value);
    }
}

datatest_stable::harness! {
    { test = run_fixture, root = "tests/fixtures", pattern = r"\.fixture$" },
}
