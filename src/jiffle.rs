//! The compilation unit: one script, its image parameters and everything
//! derived from them.

use crate::{
    codegen::{self, source, CompiledProcedure, EvaluationModel, ImageSlot},
    context::JiffleContext,
    error::{JiffleError, JiffleResult},
    language::{
        ast::Script,
        classify::classify_variables,
        errors::Diagnostics,
        parser::parse_script,
        roles::{ImageRole, VarRoles},
        transform::transform,
        validate::validate_functions,
    },
    runtime::{self, Bindings, RuntimeEvaluator},
};
use std::{collections::BTreeMap, collections::HashMap, fs, path::Path, sync::Arc};
use tracing::{debug, info, instrument};

/// Pipeline stages, in the order compilation passes through them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompileStage {
    Empty,
    ScriptSet,
    AstBuilt,
    FunctionsValidated,
    VarsClassified,
    Transformed,
}

pub struct Jiffle<'ctx> {
    context: &'ctx JiffleContext,
    name: String,
    script: Option<String>,
    image_params: BTreeMap<String, ImageRole>,
    stage: CompileStage,
    primary: Option<Script>,
    roles: Option<VarRoles>,
    final_tree: Option<Script>,
    diagnostics: Diagnostics,
    procedures: HashMap<EvaluationModel, Arc<CompiledProcedure>>,
}

impl<'ctx> Jiffle<'ctx> {
    pub fn new(context: &'ctx JiffleContext) -> Self {
        Self {
            context,
            name: context.next_name(),
            script: None,
            image_params: BTreeMap::new(),
            stage: CompileStage::Empty,
            primary: None,
            roles: None,
            final_tree: None,
            diagnostics: Diagnostics::new(),
            procedures: HashMap::new(),
        }
    }

    /// Sets the script and parameters and compiles in one step.
    pub fn compiled<I, K>(
        context: &'ctx JiffleContext,
        script: &str,
        params: I,
    ) -> JiffleResult<Self>
    where
        I: IntoIterator<Item = (K, ImageRole)>,
        K: Into<String>,
    {
        let mut jiffle = Self::new(context);
        jiffle.set_script(script)?;
        jiffle.set_image_params(params);
        jiffle.compile()?;
        Ok(jiffle)
    }

    /// Replaces the script, discarding everything derived from the old one.
    /// Empty or whitespace-only text is rejected and leaves the unit as it was.
    pub fn set_script(&mut self, script: &str) -> JiffleResult<()> {
        if script.trim().is_empty() {
            return Err(JiffleError::Config("Script is empty".to_string()));
        }
        // a trailing newline keeps a final comment from running into EOF
        self.script = Some(format!("{script}\n"));
        self.clear_compiled();
        Ok(())
    }

    /// Reads a script file, dropping blank lines and surrounding whitespace.
    pub fn set_script_file(&mut self, path: impl AsRef<Path>) -> JiffleResult<()> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|err| {
            JiffleError::Config(format!("failed to read {}: {err}", path.display()))
        })?;
        let script = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        self.set_script(&script)
    }

    pub fn script(&self) -> &str {
        self.script.as_deref().unwrap_or("")
    }

    /// Replaces the image parameters, discarding compiled artifacts.
    pub fn set_image_params<I, K>(&mut self, params: I)
    where
        I: IntoIterator<Item = (K, ImageRole)>,
        K: Into<String>,
    {
        self.image_params = params
            .into_iter()
            .map(|(name, role)| (name.into(), role))
            .collect();
        self.clear_compiled();
    }

    pub fn image_params(&self) -> &BTreeMap<String, ImageRole> {
        &self.image_params
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn stage(&self) -> CompileStage {
        self.stage
    }

    pub fn is_compiled(&self) -> bool {
        self.stage == CompileStage::Transformed && self.final_tree.is_some()
    }

    /// Findings of the last compilation: its errors when it failed, its
    /// warnings when it succeeded.
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Variable roles from the last successful classification.
    pub fn roles(&self) -> Option<&VarRoles> {
        self.roles.as_ref()
    }

    /// Runs the pipeline from the script text to the final tree.
    ///
    /// Any failure leaves the unit at the last stage that completed; the
    /// function and variable stages report every finding, not only the first.
    #[instrument(skip(self), fields(name = %self.name))]
    pub fn compile(&mut self) -> JiffleResult<()> {
        let script = self
            .script
            .clone()
            .ok_or_else(|| JiffleError::Config("No script has been set".to_string()))?;
        if self.image_params.is_empty() {
            return Err(JiffleError::Config("No image parameters set".to_string()));
        }
        self.clear_compiled();

        let primary = parse_script(&script).map_err(|err| {
            info!(%err, "script rejected by parser");
            err
        })?;
        self.advance(CompileStage::AstBuilt);

        let findings = validate_functions(&primary);
        self.primary = Some(primary);
        if findings.has_errors() {
            return Err(self.fail(findings, JiffleError::Function));
        }
        self.advance(CompileStage::FunctionsValidated);

        let Some(primary) = self.primary.as_ref() else {
            return Err(JiffleError::Config("Syntax tree is missing".to_string()));
        };
        let classification = classify_variables(
            primary,
            &self.image_params,
            self.context.options().implicit_sources,
        );
        if classification.diagnostics.has_errors() {
            return Err(self.fail(classification.diagnostics, JiffleError::Variable));
        }
        let final_tree = transform(primary, &classification.roles);
        self.diagnostics = classification.diagnostics;
        self.roles = Some(classification.roles);
        self.advance(CompileStage::VarsClassified);

        self.final_tree = Some(final_tree);
        self.advance(CompileStage::Transformed);
        info!(warnings = self.diagnostics.len(), "script compiled");
        Ok(())
    }

    /// Compiled procedure for `model`, generated once per compilation.
    pub fn procedure(&mut self, model: EvaluationModel) -> JiffleResult<Arc<CompiledProcedure>> {
        if let Some(procedure) = self.procedures.get(&model) {
            return Ok(Arc::clone(procedure));
        }
        let tree = self.final_tree()?;
        let procedure = Arc::new(codegen::generate(tree, model, self.image_slots())?);
        self.procedures.insert(model, Arc::clone(&procedure));
        Ok(procedure)
    }

    /// Binds images to the compiled script. Each call yields an independent
    /// evaluator, so one can be built per worker.
    #[instrument(skip(self, bindings), fields(name = %self.name))]
    pub fn build_runtime(
        &mut self,
        model: EvaluationModel,
        bindings: Bindings,
    ) -> JiffleResult<RuntimeEvaluator> {
        let procedure = self.procedure(model)?;
        Ok(runtime::build(procedure, bindings, self.context.options())?)
    }

    /// Readable listing of what the script compiles to for `model`, optionally
    /// headed by the script itself.
    pub fn get_generated_source(
        &self,
        model: EvaluationModel,
        include_script_docs: bool,
    ) -> JiffleResult<String> {
        let tree = self.final_tree()?;
        let docs = include_script_docs.then(|| self.script());
        Ok(source::render(tree, model, &self.name, &self.image_slots(), docs)?)
    }

    fn final_tree(&self) -> JiffleResult<&Script> {
        match (&self.final_tree, self.is_compiled()) {
            (Some(tree), true) => Ok(tree),
            _ => Err(JiffleError::Config(
                "Script has not been compiled".to_string(),
            )),
        }
    }

    fn image_slots(&self) -> Vec<ImageSlot> {
        match &self.roles {
            Some(roles) => roles
                .images()
                .map(|(name, role)| ImageSlot {
                    name: name.to_string(),
                    role,
                })
                .collect(),
            None => Vec::new(),
        }
    }

    fn advance(&mut self, stage: CompileStage) {
        debug!(from = ?self.stage, to = ?stage, "stage complete");
        self.stage = stage;
    }

    fn fail(
        &mut self,
        findings: Diagnostics,
        kind: fn(Diagnostics) -> JiffleError,
    ) -> JiffleError {
        info!(
            stage = ?self.stage,
            errors = findings.errors().count(),
            "script failed validation"
        );
        self.diagnostics = findings.clone();
        kind(findings)
    }

    fn clear_compiled(&mut self) {
        self.stage = if self.script.is_some() {
            CompileStage::ScriptSet
        } else {
            CompileStage::Empty
        };
        self.primary = None;
        self.roles = None;
        self.final_tree = None;
        self.diagnostics = Diagnostics::new();
        self.procedures.clear();
    }
}
