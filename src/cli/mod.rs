// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// This is the entry point for all user interaction.
// It uses the `clap` crate to parse command line arguments.
// All business logic is delegated to Layer 2 (application).
//
// `-lr` and `-ch` are two-letter short flags, which clap cannot
// express; normalize_legacy_flags rewrites them to their long
// forms before parsing.
//
// Reference: Rust Book §7 (Modules), §12 (CLI programs)

pub mod commands;

use anyhow::Result;
use clap::Parser;
use std::ffi::OsString;

use crate::application::train_use_case::TrainUseCase;
use commands::TrainArgs;

#[derive(Parser, Debug)]
#[command(
    name = "segtrain",
    version,
    about = "Train an FCN segmentation model on a Pascal-VOC-style dataset, resuming from the latest checkpoint."
)]
pub struct Cli {
    #[command(flatten)]
    pub train: TrainArgs,
}

impl Cli {
    /// Converts the args into a TrainConfig and hands off to Layer 2.
    pub fn run(self) -> Result<()> {
        let use_case = TrainUseCase::new(self.train.into());
        tracing::info!(
            "Training on '{}', checkpoints in '{}'",
            use_case.config().dataset_root,
            use_case.config().checkpoint_dir
        );

        let summary = use_case.execute()?;
        match summary.last_checkpoint {
            Some(path) => println!("Training complete. Last checkpoint: {}", path.display()),
            None       => println!("Training complete. Nothing left to run."),
        }
        Ok(())
    }
}

/// Rewrite `-lr`/`-ch` (and `-lr=x`/`-ch=x`) to `--l_rate`/`--checkpoint`.
/// Arguments after a bare `--` are left alone.
pub fn normalize_legacy_flags<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let mut passthrough = false;
    args.into_iter()
        .map(Into::into)
        .map(|arg| {
            if passthrough {
                return arg;
            }
            let Some(s) = arg.to_str() else { return arg };
            if s == "--" {
                passthrough = true;
                return arg;
            }
            for (short, long) in [("-lr", "--l_rate"), ("-ch", "--checkpoint")] {
                if s == short {
                    return OsString::from(long);
                }
                if let Some(value) = s.strip_prefix(short).and_then(|r| r.strip_prefix('=')) {
                    return OsString::from(format!("{long}={value}"));
                }
            }
            arg
        })
        .collect()
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::TrainConfig;
    use crate::ml::backbone::BackboneKind;

    fn parse(args: &[&str]) -> Result<TrainConfig, clap::Error> {
        let argv = std::iter::once("segtrain").chain(args.iter().copied());
        Cli::try_parse_from(normalize_legacy_flags(argv)).map(|cli| cli.train.into())
    }

    #[test]
    fn test_defaults() {
        let cfg = parse(&[]).unwrap();
        assert_eq!(cfg.classes, "./");
        assert_eq!(cfg.dataset_root, "./");
        assert_eq!(cfg.checkpoint_dir, "./");
        assert_eq!(cfg.batch_size, 12);
        assert_eq!(cfg.lr, 0.001);
        assert_eq!(cfg.weight_decay, 0.0001);
        assert_eq!(cfg.epochs, 50);
        assert_eq!(cfg.save_every, 10);
        assert_eq!(cfg.backbone, BackboneKind::Resnet101);
        assert_eq!(cfg.base_width, 64);
        assert!(!cfg.validate);
    }

    #[test]
    fn test_legacy_short_flags() {
        let cfg = parse(&[
            "-c", "classes.txt", "-p", "/data/voc", "-b", "4",
            "-lr", "0.01", "-w", "0.0005", "-e", "25", "-ch", "/ckpt",
        ])
        .unwrap();
        assert_eq!(cfg.classes, "classes.txt");
        assert_eq!(cfg.dataset_root, "/data/voc");
        assert_eq!(cfg.batch_size, 4);
        assert_eq!(cfg.lr, 0.01);
        assert_eq!(cfg.weight_decay, 0.0005);
        assert_eq!(cfg.epochs, 25);
        assert_eq!(cfg.checkpoint_dir, "/ckpt");
    }

    #[test]
    fn test_long_flags_and_equals_forms() {
        let cfg = parse(&[
            "--l_rate", "0.02", "-ch=/runs/a", "--path_dataset=/voc",
            "--backbone", "resnet50", "--base-width", "32", "--validate", "--pretrained-backbone", "r50.bin",
        ])
        .unwrap();
        assert_eq!(cfg.lr, 0.02);
        assert_eq!(cfg.checkpoint_dir, "/runs/a");
        assert_eq!(cfg.dataset_root, "/voc");
        assert_eq!(cfg.backbone, BackboneKind::Resnet50);
        assert_eq!(cfg.base_width, 32);
        assert!(cfg.validate);
        assert_eq!(cfg.pretrained_backbone.as_deref(), Some("r50.bin"));

        let cfg = parse(&["-lr=0.5"]).unwrap();
        assert_eq!(cfg.lr, 0.5);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(parse(&["-b", "0"]).is_err());
        assert!(parse(&["-e", "many"]).is_err());
        assert!(parse(&["--backbone", "vgg16"]).is_err());
        assert!(parse(&["--base-width", "0"]).is_err());
    }

    #[test]
    fn test_normalize_leaves_other_args() {
        let out = normalize_legacy_flags(["segtrain", "-c", "-lrx", "--", "-lr"]);
        let out: Vec<&str> = out.iter().map(|s| s.to_str().unwrap()).collect();
        assert_eq!(out, vec!["segtrain", "-c", "-lrx", "--", "-lr"]);
    }
}
