use crate::pipeline::context::PipelineContext;
use crate::pipeline::phase_trait::WorkflowPhase;
use crate::pipeline::report::StageStatus;
use crate::resolver::{
    interpreter_site_packages, read_distributions, PackageResolver, StandardLibrary,
};
use anyhow::Result;
use async_trait::async_trait;
use tracing::{debug, info};

pub struct ResolvePhase;

#[async_trait]
impl WorkflowPhase for ResolvePhase {
    fn name(&self) -> &'static str {
        "resolve"
    }

    async fn execute(&self, context: &mut PipelineContext) -> Result<StageStatus> {
        if context.requirement_list.is_some() {
            return Ok(StageStatus::skipped("requirement list already provided"));
        }
        let Some(imports) = context.imports.as_ref() else {
            return Ok(StageStatus::skipped("no imports were extracted"));
        };

        let site_dirs = if context.config.site_packages.is_empty() {
            interpreter_site_packages(&context.config.interpreter).await
        } else {
            context.config.site_packages.clone()
        };
        let distributions = read_distributions(&site_dirs);
        let stdlib = StandardLibrary::discover(&context.config.interpreter).await;
        debug!(
            site_dirs = site_dirs.len(),
            distributions = distributions.len(),
            stdlib = stdlib.len(),
            "Resolver inputs loaded"
        );

        let resolver = PackageResolver::new(distributions, stdlib, context.index.clone());
        let mapping = resolver.resolve(&imports.modules).await;

        let unresolved = mapping.unresolved().len();
        let requirement_list = mapping.requirement_list();
        info!(
            packages = mapping.packages().len(),
            unresolved,
            "Requirement list built"
        );

        context.requirement_list = Some(requirement_list);
        context.mapping = Some(mapping);

        if unresolved > 0 {
            Ok(StageStatus::degraded(format!(
                "{} import(s) could not be mapped to a package",
                unresolved
            )))
        } else {
            Ok(StageStatus::Complete)
        }
    }
}
