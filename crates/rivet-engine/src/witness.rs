//! GraphML witness output.
//!
//! Violation witnesses are rendered from a counterexample trace, correctness
//! witnesses from the equation itself (nodes = steps/states, edges = control
//! flow taken). When the destination is unset the reporter is a no-op, not
//! an error.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::{info, warn};

use rivet_ir::equation::Equation;
use rivet_ir::trace::Trace;

const PRODUCER: &str = concat!("rivet ", env!("CARGO_PKG_VERSION"));

/// Write a violation witness for `trace`, hashing `program_file` into the
/// header when available. No-op when `path` is `None`.
pub fn output_graphml_for_trace(
    path: Option<&Path>,
    trace: &Trace,
    program_file: Option<&Path>,
) -> std::io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    fs::write(path, graphml_from_trace(trace, program_file))?;
    info!(path = %path.display(), "GraphML violation witness written");
    Ok(())
}

/// Write a correctness witness for the post-processed equation. No-op when
/// `path` is `None`.
pub fn output_graphml_for_equation(
    path: Option<&Path>,
    equation: &Equation,
    program_file: Option<&Path>,
) -> std::io::Result<()> {
    let Some(path) = path else {
        return Ok(());
    };
    fs::write(path, graphml_from_equation(equation, program_file))?;
    info!(path = %path.display(), "GraphML correctness witness written");
    Ok(())
}

pub fn graphml_from_trace(trace: &Trace, program_file: Option<&Path>) -> String {
    let mut out = header("violation_witness", program_file);

    let node_count = trace.len() + 1;
    for i in 0..node_count {
        let _ = writeln!(out, "    <node id=\"N{i}\">");
        if i == 0 {
            let _ = writeln!(out, "      <data key=\"entry\">true</data>");
        }
        if i + 1 == node_count {
            let _ = writeln!(out, "      <data key=\"violation\">true</data>");
        }
        let _ = writeln!(out, "    </node>");
    }

    for (i, step) in trace.steps.iter().enumerate() {
        let _ = writeln!(
            out,
            "    <edge id=\"E{i}\" source=\"N{i}\" target=\"N{}\">",
            i + 1
        );
        if step.source.line > 0 {
            let _ = writeln!(
                out,
                "      <data key=\"startline\">{}</data>",
                step.source.line
            );
        }
        if let Some(assignment) = &step.assignment {
            if let Some(value) = &assignment.value {
                let _ = writeln!(
                    out,
                    "      <data key=\"assumption\">{} == {};</data>",
                    xml_escape(&assignment.symbol),
                    value
                );
            }
        }
        if let Some(property) = &step.property {
            if property.violated {
                let _ = writeln!(
                    out,
                    "      <data key=\"property\">{}</data>",
                    xml_escape(&property.id)
                );
            }
        }
        let _ = writeln!(out, "    </edge>");
    }

    footer(&mut out);
    out
}

pub fn graphml_from_equation(equation: &Equation, program_file: Option<&Path>) -> String {
    let mut out = header("correctness_witness", program_file);

    let active: Vec<usize> = equation.iter_active().map(|(i, _)| i).collect();
    for (n, _) in active.iter().enumerate() {
        let _ = writeln!(out, "    <node id=\"N{n}\">");
        if n == 0 {
            let _ = writeln!(out, "      <data key=\"entry\">true</data>");
        }
        let _ = writeln!(out, "    </node>");
    }

    for (n, index) in active.iter().enumerate().skip(1) {
        let step = &equation.steps()[*index];
        let _ = writeln!(
            out,
            "    <edge id=\"E{}\" source=\"N{}\" target=\"N{n}\">",
            n - 1,
            n - 1
        );
        if step.source.line > 0 {
            let _ = writeln!(
                out,
                "      <data key=\"startline\">{}</data>",
                step.source.line
            );
        }
        let _ = writeln!(out, "    </edge>");
    }

    footer(&mut out);
    out
}

fn header(witness_type: &str, program_file: Option<&Path>) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "<?xml version=\"1.0\" encoding=\"UTF-8\"?>");
    let _ = writeln!(
        out,
        "<graphml xmlns=\"http://graphml.graphdrawing.org/xmlns\">"
    );
    for key in [
        "witness-type",
        "producer",
        "programfile",
        "programhash",
        "entry",
        "violation",
        "startline",
        "assumption",
        "property",
    ] {
        let _ = writeln!(
            out,
            "  <key id=\"{key}\" attr.name=\"{key}\" for=\"all\"/>"
        );
    }
    let _ = writeln!(out, "  <graph edgedefault=\"directed\">");
    let _ = writeln!(
        out,
        "    <data key=\"witness-type\">{witness_type}</data>"
    );
    let _ = writeln!(out, "    <data key=\"producer\">{PRODUCER}</data>");
    if let Some(program) = program_file {
        let _ = writeln!(
            out,
            "    <data key=\"programfile\">{}</data>",
            xml_escape(&program.display().to_string())
        );
        match program_hash(program) {
            Some(hash) => {
                let _ = writeln!(out, "    <data key=\"programhash\">{hash}</data>");
            }
            None => warn!(program = %program.display(), "could not hash program file"),
        }
    }
    out
}

fn footer(out: &mut String) {
    let _ = writeln!(out, "  </graph>");
    let _ = writeln!(out, "</graphml>");
}

fn program_hash(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(64);
    for byte in digest {
        let _ = write!(hex, "{byte:02x}");
    }
    Some(hex)
}

fn xml_escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivet_ir::equation::{SourceLocation, Step, StepKind};
    use rivet_ir::expr::Expr;
    use rivet_ir::trace::{ConcreteValue, TraceAssignment, TraceProperty, TraceStep};

    fn sample_trace() -> Trace {
        Trace {
            steps: vec![
                TraceStep {
                    step_index: 0,
                    label: "ASSIGNMENT".into(),
                    thread: 0,
                    source: SourceLocation::new("main.c", "main", 3),
                    assignment: Some(TraceAssignment {
                        symbol: "x".into(),
                        value: Some(ConcreteValue::Int(5)),
                    }),
                    property: None,
                },
                TraceStep {
                    step_index: 1,
                    label: "ASSERT".into(),
                    thread: 0,
                    source: SourceLocation::new("main.c", "main", 4),
                    assignment: None,
                    property: Some(TraceProperty {
                        id: "main.assertion.1".into(),
                        description: "x bounds".into(),
                        violated: true,
                    }),
                },
            ],
        }
    }

    #[test]
    fn unset_destination_is_a_noop() {
        assert!(output_graphml_for_trace(None, &sample_trace(), None).is_ok());
        assert!(output_graphml_for_equation(None, &Equation::new(), None).is_ok());
    }

    #[test]
    fn violation_witness_structure() {
        let xml = graphml_from_trace(&sample_trace(), None);
        assert!(xml.contains("witness-type\">violation_witness"));
        assert!(xml.contains("<node id=\"N0\">"));
        assert!(xml.contains("entry\">true"));
        assert!(xml.contains("violation\">true"));
        assert!(xml.contains("startline\">3"));
        assert!(xml.contains("assumption\">x == 5;"));
        assert!(xml.contains("property\">main.assertion.1"));
        assert!(xml.ends_with("</graphml>\n"));
    }

    #[test]
    fn correctness_witness_from_equation() {
        let mut eq = Equation::new();
        eq.push(
            Step::new(StepKind::Location, Expr::bool(true))
                .with_source(SourceLocation::new("a.c", "f", 1)),
        );
        eq.push(
            Step::new(StepKind::Location, Expr::bool(true))
                .with_source(SourceLocation::new("a.c", "f", 2)),
        );
        let xml = graphml_from_equation(&eq, None);
        assert!(xml.contains("witness-type\">correctness_witness"));
        assert!(xml.contains("<edge id=\"E0\" source=\"N0\" target=\"N1\">"));
    }

    #[test]
    fn witness_written_to_disk_with_hash() {
        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("prog.c");
        std::fs::write(&program, "int main() { return 0; }\n").unwrap();
        let witness = dir.path().join("witness.graphml");

        output_graphml_for_trace(Some(&witness), &sample_trace(), Some(&program)).unwrap();
        let xml = std::fs::read_to_string(&witness).unwrap();
        assert!(xml.contains("programfile\">"));
        assert!(xml.contains("programhash\">"));
        // sha256 hex digest is 64 chars
        let hash_line = xml
            .lines()
            .find(|l| l.contains("programhash"))
            .unwrap()
            .to_string();
        let hash = hash_line
            .split('>')
            .nth(1)
            .unwrap()
            .split('<')
            .next()
            .unwrap();
        assert_eq!(hash.len(), 64);
    }

    #[test]
    fn xml_escaping() {
        assert_eq!(xml_escape("a<b&\"c\""), "a&lt;b&amp;&quot;c&quot;");
    }
}
