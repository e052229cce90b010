//! Track build command

use std::collections::HashSet;
use std::fs;

use anyhow::{Context, Result};
use trackforge_mesh::{
    build_track, BuildContext, CollectingHost, MeshReuseIndex, TemplateGeometryCache,
};

use crate::format::TrackFile;
use crate::obj;

pub struct BuildArgs {
    pub track: String,
    pub output: Option<String>,
}

pub fn run(args: BuildArgs) -> Result<()> {
    let text = fs::read_to_string(&args.track)
        .with_context(|| format!("failed to read {}", args.track))?;
    let file = TrackFile::parse(&text)?;
    let mut track = file.to_track();
    let templates = file.to_templates()?;

    let mut cache = TemplateGeometryCache::new();
    let mut reuse = MeshReuseIndex::new(file.track.hash_method);
    let mut host = CollectingHost::default();
    let (built, report) = {
        let mut ctx = BuildContext {
            templates: &templates,
            geometry_cache: &mut cache,
            reuse: &mut reuse,
            host: &mut host,
        };
        build_track(&mut track, &mut ctx)?
    };

    for warning in &host.warnings {
        println!("  [WARN ] {}", warning);
    }
    for error in &host.errors {
        println!("  [ERROR] {}", error);
    }

    let path = track.path()?;
    println!("{}: {}", file.track.name, report);
    println!(
        "  {} path segments over {} units, {} template copies, {} spaced objects",
        path.len(),
        path.total_length(),
        built.copies.len(),
        built.spaced.len()
    );

    if let Some(output) = &args.output {
        let mut seen = HashSet::new();
        let mut meshes = Vec::new();
        for copy in &built.copies {
            for key in &copy.meshes {
                if !seen.insert(key.clone()) {
                    continue;
                }
                if let Some(stored) = reuse.get(key) {
                    meshes.push(&stored.mesh);
                }
            }
        }
        let document = obj::to_obj_string(&meshes)?;
        fs::write(output, document).with_context(|| format!("failed to write {}", output))?;
        println!("  wrote {} meshes to {}", meshes.len(), output);
    }

    if !host.errors.is_empty() {
        std::process::exit(1);
    }
    Ok(())
}
