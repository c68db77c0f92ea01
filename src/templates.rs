//! Template and kneeboard generator collaborators
//!
//! Templates live under `<root>/<airframe>/dtc/<id>.json` (simulator documents)
//! and `<root>/<airframe>/kneeboards/<id>/` (kneeboard template packages).

use anyhow::{Context, Result, bail};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::airframe::AirframeKind;
use crate::constants::templates::{DTC_DIR, DTC_EXTENSION, KNEEBOARD_DIR, PLAN_SUFFIX};
use crate::mission::Mission;

pub trait TemplateSource {
    /// Text of the simulator document template `template_id`
    fn load_dtc_template(&self, airframe: AirframeKind, template_id: &str) -> Result<String>;

    /// Copy the kneeboard templates of package `template_id` whose identifier
    /// (file stem) is in `filter` into `dest`; an empty filter takes every template
    fn extract_kneeboard_package(
        &self,
        airframe: AirframeKind,
        template_id: &str,
        filter: &[String],
        dest: &Path,
    ) -> Result<Vec<PathBuf>>;
}

/// Everything the kneeboard generator needs for one run
#[derive(Debug, Clone)]
pub struct KneeboardRequest<'a> {
    pub template_dir: &'a Path,
    pub output_path: &'a Path,
    pub mission: &'a Mission,
    pub night_mode: bool,
    pub vector_mode: bool,
}

pub trait KneeboardGenerator {
    /// Produce kneeboards and return the paths written
    fn generate(&self, request: &KneeboardRequest<'_>) -> Result<Vec<PathBuf>>;
}

#[derive(Debug, Clone)]
pub struct FileTemplates {
    root: PathBuf,
}

impl FileTemplates {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn airframe_dir(&self, airframe: AirframeKind) -> PathBuf {
        self.root.join(airframe.dir_name())
    }
}

impl TemplateSource for FileTemplates {
    fn load_dtc_template(&self, airframe: AirframeKind, template_id: &str) -> Result<String> {
        let path = self
            .airframe_dir(airframe)
            .join(DTC_DIR)
            .join(format!("{template_id}.{DTC_EXTENSION}"));
        fs::read_to_string(&path).with_context(|| format!("Failed to read DTC template {:?}", path))
    }

    fn extract_kneeboard_package(
        &self,
        airframe: AirframeKind,
        template_id: &str,
        filter: &[String],
        dest: &Path,
    ) -> Result<Vec<PathBuf>> {
        let package = self.airframe_dir(airframe).join(KNEEBOARD_DIR).join(template_id);
        if !package.is_dir() {
            bail!("Kneeboard package {:?} does not exist", package);
        }

        let mut extracted = Vec::new();
        for entry in fs::read_dir(&package).with_context(|| format!("Failed to read {:?}", package))? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let (Some(stem), Some(name)) = (path.file_stem(), path.file_name()) else {
                continue;
            };
            let stem = stem.to_string_lossy();
            if !filter.is_empty() && !filter.iter().any(|f| f.eq_ignore_ascii_case(&stem)) {
                continue;
            }

            let target = dest.join(name);
            fs::copy(&path, &target)
                .with_context(|| format!("Failed to extract {:?} to {:?}", path, target))?;
            debug!(template = %stem, "Extracted kneeboard template");
            extracted.push(target);
        }
        extracted.sort();
        Ok(extracted)
    }
}

/// Writes one `<template>.plan.json` per template into the output directory,
/// pairing the template with the mission for an external renderer
#[derive(Debug, Clone, Default)]
pub struct PlanFileGenerator;

#[derive(Serialize)]
struct PlanFile<'a> {
    template: String,
    night_mode: bool,
    vector_mode: bool,
    mission: &'a Mission,
}

impl KneeboardGenerator for PlanFileGenerator {
    fn generate(&self, request: &KneeboardRequest<'_>) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(request.output_path)
            .with_context(|| format!("Failed to create kneeboard directory {:?}", request.output_path))?;

        let mut templates: Vec<PathBuf> = fs::read_dir(request.template_dir)
            .with_context(|| format!("Failed to read {:?}", request.template_dir))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect();
        templates.sort();

        let mut produced = Vec::new();
        for template in templates {
            let Some(stem) = template.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let plan = PlanFile {
                template: template
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
                night_mode: request.night_mode,
                vector_mode: request.vector_mode,
                mission: request.mission,
            };
            let path = request.output_path.join(format!("{stem}.{PLAN_SUFFIX}"));
            let json = serde_json::to_string_pretty(&plan).context("Failed to serialize kneeboard plan")?;
            fs::write(&path, json).with_context(|| format!("Failed to write {:?}", path))?;
            produced.push(path);
        }
        Ok(produced)
    }
}
