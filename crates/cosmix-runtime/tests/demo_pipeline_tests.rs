//! Integration tests driving the runtime API directly.
//!
//! The demo parameter file at the workspace root is loaded, resolved and
//! evaluated with the builtin modules; a custom module is mixed in through
//! the registry.

use cosmix_block::DataBlock;
use cosmix_module::{ConfigureContext, Module, ModuleError, Outcome};
use cosmix_runtime::config::{Resolved, Resolver};
use cosmix_runtime::output::MemoryOutput;
use cosmix_runtime::sampler::run;
use cosmix_runtime::{
    create_sampler, output_columns, CancelToken, ConfigLoader, ModuleRegistry, OutputWriter,
    Overrides, Pipeline, StepContext, Variables, WorkerPool,
};
use std::path::PathBuf;

fn demo_params() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos/params.toml")
}

fn demo_config(overrides: Overrides) -> Resolved {
    let config = ConfigLoader::new(demo_params())
        .skip_env_vars()
        .load()
        .expect("demo params should load");
    Resolver::new(overrides, Variables::new())
        .resolve(config)
        .expect("demo params should resolve")
}

fn demo_pipeline(overrides: Overrides, registry: &ModuleRegistry) -> Pipeline {
    let resolved = demo_config(overrides);
    Pipeline::build(&resolved.config, resolved.space, registry).expect("demo pipeline")
}

// =============================================================================
// Demo pipeline
// =============================================================================

mod demo {
    use super::*;

    #[test]
    fn start_point_is_valid() {
        let pipeline = demo_pipeline(Overrides::new(), &ModuleRegistry::with_builtins());
        assert_eq!(pipeline.space().dim(), 2);
        assert_eq!(
            pipeline.extra_columns(),
            vec!["cosmological_parameters--omega_m"]
        );

        let eval = pipeline
            .evaluate(&pipeline.space().start())
            .expect("start should evaluate");
        assert!(eval.is_valid(), "{eval:?}");
        assert!(eval.like < 0.0);
        // Gaussian prior on h0 at its mean plus the flat prior on omega_c.
        assert!(eval.prior.is_finite());
        assert!((eval.derived[0] - (0.261 + 0.049)).abs() < 1e-12);
    }

    #[test]
    fn closer_to_data_is_more_likely() {
        let pipeline = demo_pipeline(Overrides::new(), &ModuleRegistry::with_builtins());
        let good = pipeline.evaluate(&[0.261, 0.7]).expect("good");
        let poor = pipeline.evaluate(&[0.261, 0.55]).expect("poor");
        assert!(good.like > poor.like);
    }

    #[test]
    fn grid_over_demo_space() {
        let overrides = Overrides::new()
            .with("runtime", "sampler", "grid")
            .with("grid", "nsample_dimension", "3");
        let resolved = demo_config(overrides);
        let pipeline = Pipeline::build(
            &resolved.config,
            resolved.space,
            &ModuleRegistry::with_builtins(),
        )
        .expect("pipeline");
        let mut sampler = create_sampler(&resolved.config, None).expect("sampler");
        let pool = WorkerPool::new(2).expect("pool");
        let cancel = CancelToken::new();

        let output = MemoryOutput::new();
        let mut writer: Box<dyn OutputWriter> = Box::new(output.clone());
        writer
            .begin(&output_columns(&pipeline), &[])
            .expect("begin");
        let ctx = StepContext::new(&pipeline, &pool, &cancel);
        for batch in run(sampler.as_mut(), ctx) {
            for record in batch.expect("batch") {
                writer.record(&record.row()).expect("record");
            }
        }
        writer.finalize().expect("finalize");

        let table = output.table();
        assert_eq!(table.rows.len(), 9);
        assert!(table.rows.iter().all(|row| row.iter().all(|v| !v.is_nan())));
    }
}

// =============================================================================
// Custom modules alongside the builtins
// =============================================================================

mod custom_module {
    use super::*;

    /// Adds a flat offset to the total likelihood.
    struct Offset {
        value: f64,
    }

    impl Module for Offset {
        fn configure(&mut self, ctx: &mut ConfigureContext<'_>) -> Result<(), ModuleError> {
            self.value = ctx.get_real_or("value", 0.0)?;
            Ok(())
        }

        fn execute(&self, block: &mut DataBlock) -> Result<Outcome, ModuleError> {
            block.put("likelihoods", "offset_like", self.value)?;
            Ok(Outcome::Success)
        }
    }

    fn registry() -> ModuleRegistry {
        let mut registry = ModuleRegistry::with_builtins();
        registry.register_fn("offset", "constant likelihood term", || {
            Box::new(Offset { value: 0.0 })
        });
        registry
    }

    #[test]
    fn contributes_to_total_likelihood() {
        let base = demo_pipeline(Overrides::new(), &ModuleRegistry::with_builtins());
        // [offset] is not in the demo file, so it is added to the config
        // rather than overridden.
        let mut resolved = demo_config(
            Overrides::new()
                .with("pipeline", "modules", "consistency background hubble offset")
                .with("pipeline", "likelihoods", "hubble offset"),
        );
        resolved
            .config
            .block_mut()
            .put("offset", "value", -3.5)
            .expect("offset value");
        let shifted =
            Pipeline::build(&resolved.config, resolved.space, &registry()).expect("shifted");

        let point = base.space().start();
        let a = base.evaluate(&point).expect("base");
        let b = shifted.evaluate(&point).expect("shifted");
        assert!((b.like - (a.like - 3.5)).abs() < 1e-9);
    }
}
