//! `sigil abi`: show what one class file contributes to a classpath fingerprint.

use std::fmt::Write as _;

use sigil_classfile::{ApiClass, ApiClassExtractor, ClassFile};
use sigil_common::ContentHash;
use sigil_config::OutputFormat;

use crate::context;
use crate::{AbiArgs, GlobalArgs};

/// Everything the command reports about a class.
struct AbiReport {
    eligible: bool,
    api: ApiClass,
    hash: Option<ContentHash>,
}

/// Runs the `sigil abi` command.
pub fn run(args: &AbiArgs, global: &GlobalArgs) -> Result<i32, Box<dyn std::error::Error>> {
    let config = context::load_config(global)?;
    let format = args
        .format
        .map(OutputFormat::from)
        .unwrap_or(config.output.format);

    let bytes = std::fs::read(&args.class_file)
        .map_err(|e| format!("failed to read {}: {e}", args.class_file.display()))?;
    let class = ClassFile::parse(&bytes)
        .map_err(|e| format!("malformed class file {}: {e}", args.class_file.display()))?;

    let extractor = ApiClassExtractor::new(&config.extraction.exported_packages);
    let report = inspect(&extractor, &class)?;

    match format {
        OutputFormat::Text => print!("{}", render_text(&report)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&to_json(&report))?),
    }
    Ok(0)
}

fn inspect(
    extractor: &ApiClassExtractor,
    class: &ClassFile,
) -> Result<AbiReport, Box<dyn std::error::Error>> {
    let eligible = extractor.is_eligible(class);
    let hash = if eligible {
        extractor.extract(class)?.map(|abi| ContentHash::from_bytes(&abi))
    } else {
        None
    };
    Ok(AbiReport {
        eligible,
        api: extractor.api_class(class),
        hash,
    })
}

fn render_text(report: &AbiReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "class    {}", report.api.name);
    let _ = writeln!(out, "eligible {}", if report.eligible { "yes" } else { "no" });
    match report.hash {
        Some(hash) => {
            let _ = writeln!(out, "abi      {hash}");
        }
        None => {
            let _ = writeln!(out, "abi      (ignored)");
        }
    }
    if !report.eligible {
        return out;
    }
    for field in &report.api.fields {
        let _ = writeln!(out, "  field  {:#06x} {} {}", field.access.bits(), field.name, field.descriptor);
    }
    for method in &report.api.methods {
        let _ = writeln!(out, "  method {:#06x} {}{}", method.access.bits(), method.name, method.descriptor);
    }
    out
}

fn to_json(report: &AbiReport) -> serde_json::Value {
    serde_json::json!({
        "class": report.api.name,
        "eligible": report.eligible,
        "abi_hash": report.hash.map(|h| h.to_string()),
        "fields": report
            .api
            .fields
            .iter()
            .map(|f| serde_json::json!({ "name": f.name, "descriptor": f.descriptor, "access": f.access.bits() }))
            .collect::<Vec<_>>(),
        "methods": report
            .api
            .methods
            .iter()
            .map(|m| serde_json::json!({ "name": m.name, "descriptor": m.descriptor, "access": m.access.bits() }))
            .collect::<Vec<_>>(),
    })
}
