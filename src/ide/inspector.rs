//! Plain-text dump of the whole model state, for bug reports.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use chrono::Local;

use crate::base::FilePath;
use crate::hir::Snapshot;
use crate::project::{HeaderPath, HeaderPathKind, ProjectInfo, ProjectMacro, WorkingCopy};
use crate::{Error, Result};

/// What gets dumped. Borrowed from the model manager's registries.
pub struct Inspection<'a> {
    pub log_id: &'a str,
    pub projects: &'a [ProjectInfo],
    pub header_paths: &'a [HeaderPath],
    pub macros: &'a [ProjectMacro],
    pub working_copy: &'a WorkingCopy,
    pub snapshot: &'a Snapshot,
}

impl Inspection<'_> {
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = self.write_to(&mut out);
        out
    }

    fn write_to(&self, out: &mut String) -> std::fmt::Result {
        writeln!(out, "### Code model inspection ({})", self.log_id)?;
        writeln!(out)?;

        writeln!(out, "## Projects ({})", self.projects.len())?;
        for info in self.projects {
            writeln!(out, "Project {}", info.project)?;
            for part in &info.parts {
                writeln!(out, "  Part {part}")?;
                writeln!(out, "    Features: {:?}", part.features)?;
                for path in &part.header_paths {
                    writeln!(out, "    Header path: {}", header_path_text(path))?;
                }
                for m in &part.macros {
                    writeln!(out, "    {}", m.to_define_line())?;
                }
                for file in &part.files {
                    writeln!(out, "    File: {} ({:?})", file.path, file.kind)?;
                }
            }
        }
        writeln!(out)?;

        writeln!(out, "## Merged configuration")?;
        for path in self.header_paths {
            writeln!(out, "  Header path: {}", header_path_text(path))?;
        }
        for m in self.macros {
            writeln!(out, "  {}", m.to_define_line())?;
        }
        writeln!(out)?;

        writeln!(out, "## Working copy ({})", self.working_copy.len())?;
        for (path, revision) in self.working_copy.sorted() {
            writeln!(out, "  {path} (revision {revision})")?;
        }
        writeln!(out)?;

        writeln!(out, "## Snapshot ({} documents)", self.snapshot.len())?;
        for path in self.snapshot.sorted_paths() {
            self.write_document(out, &path)?;
        }
        Ok(())
    }

    fn write_document(&self, out: &mut String, path: &FilePath) -> std::fmt::Result {
        let Some(doc) = self.snapshot.document(path) else {
            return Ok(());
        };
        writeln!(
            out,
            "Document {} (revision {}, fingerprint {:016x})",
            path,
            doc.revision(),
            doc.fingerprint()
        )?;
        for include in doc.includes() {
            match &include.resolved {
                Some(target) => writeln!(out, "  include {} -> {} (line {})", include.spelled, target, include.line + 1)?,
                None => writeln!(out, "  include {} unresolved (line {})", include.spelled, include.line + 1)?,
            }
        }
        for diagnostic in doc.diagnostics() {
            writeln!(
                out,
                "  {} {}:{}: {}",
                diagnostic.severity,
                diagnostic.line + 1,
                diagnostic.column + 1,
                diagnostic.message
            )?;
        }
        for m in doc.defined_macros() {
            writeln!(out, "  {}", m.definition_text())?;
        }
        Ok(())
    }
}

fn header_path_text(path: &HeaderPath) -> String {
    let kind = match path.kind {
        HeaderPathKind::User => "user",
        HeaderPathKind::System => "system",
        HeaderPathKind::Framework => "framework",
    };
    format!("{} ({kind})", path.path)
}

/// File name of an inspection dump written now.
pub fn inspection_file_name(log_id: &str) -> String {
    let id: String = log_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    format!(
        "codemodel-inspection-{}-{}.txt",
        id,
        Local::now().format("%Y%m%d-%H%M%S%.3f")
    )
}

/// Write `text` into `dir` under an inspection file name.
pub fn write_inspection(dir: &Path, log_id: &str, text: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io(dir, e))?;
    let path = dir.join(inspection_file_name(log_id));
    std::fs::write(&path, text).map_err(|e| Error::io(&path, e))?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hir::process;
    use crate::project::{LanguageFeatures, ProjectPart};

    #[test]
    fn test_render_sections() {
        let mut wc = WorkingCopy::new();
        wc.insert("/p/a.cpp", "#include \"missing.h\"\n#define A 1\n#error oops\n", 2);
        let doc = process(&FilePath::new("/p/a.cpp"), &wc, &[], &[], LanguageFeatures::default()).unwrap();
        let mut snapshot = Snapshot::new();
        snapshot.insert(doc);
        let projects = vec![ProjectInfo::new(
            "/p/p.pro",
            vec![ProjectPart::new("/p/p.pro", "app")
                .with_files(["/p/a.cpp"])
                .with_macros([ProjectMacro::new("FOO", "1")])],
        )];
        let inspection = Inspection {
            log_id: "test",
            projects: &projects,
            header_paths: &[HeaderPath::user("/inc")],
            macros: &projects[0].macros,
            working_copy: &wc,
            snapshot: &snapshot,
        };

        let text = inspection.render();
        assert!(text.contains("Project /p/p.pro"));
        assert!(text.contains("#define FOO 1"));
        assert!(text.contains("Header path: /inc (user)"));
        assert!(text.contains("/p/a.cpp (revision 2)"));
        assert!(text.contains("include missing.h unresolved (line 1)"));
        assert!(text.contains("#define A 1"));
        assert!(text.contains(": oops"));
    }

    #[test]
    fn test_file_name_sanitizes_log_id() {
        let name = inspection_file_name("a b/c");
        assert!(name.starts_with("codemodel-inspection-a_b_c-"));
        assert!(name.ends_with(".txt"));
    }

    #[test]
    fn test_write_inspection() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_inspection(dir.path(), "id", "hello").unwrap();
        assert_eq!(std::fs::read_to_string(path).unwrap(), "hello");
    }
}
