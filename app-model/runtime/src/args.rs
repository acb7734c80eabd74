use crate::{model::DeploymentTarget, preview, translate, yaml, FileEnvGroups};
use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::{
    collections::BTreeMap,
    io::{self, Write},
    path::{Path, PathBuf},
};
use tracing::{debug, info_span, Instrument};

#[derive(Debug, Parser)]
#[clap(
    name = "porter-app-model",
    about = "Translates Porter application manifests"
)]
pub struct Args {
    #[clap(long, default_value = "porter=info,warn", env = "PORTER_APP_MODEL_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Parses a manifest of any dialect and prints the canonical application.
    Parse {
        file: PathBuf,

        #[clap(long, value_enum, default_value = "json")]
        output: Output,
    },

    /// Prints the Helm values for one service.
    Values {
        file: PathBuf,

        #[clap(long, required_unless_present = "predeploy", conflicts_with = "predeploy")]
        service: Option<String>,

        /// Prints the values of the predeploy job instead.
        #[clap(long)]
        predeploy: bool,
    },

    /// Rewrites a manifest as a v1 document.
    ExportV1 { file: PathBuf },

    /// Rewrites a manifest as a strict v2 document.
    ExportV2 { file: PathBuf },

    /// Prints the resources of a preview manifest in the order they are applied.
    Graph { file: PathBuf },

    /// Resolves an application's runtime env from a file of env groups.
    Env {
        file: PathBuf,

        #[clap(long, env = "PORTER_APP_MODEL_NAMESPACE")]
        namespace: String,

        #[clap(long)]
        env_groups: PathBuf,

        /// Merges each group's secret variables.
        #[clap(long)]
        include_secrets: bool,
    },

    /// Prints the JSON Schema of strict v2 documents.
    Schema,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Output {
    Json,
    Yaml,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            command,
        } = self;

        log_format.try_init(log_level)?;

        let mut out = Vec::new();
        command.run(&mut out).await?;

        let mut stdout = io::stdout().lock();
        stdout.write_all(&out)?;
        stdout.flush()?;
        Ok(())
    }
}

// === impl Command ===

impl Command {
    async fn run<W: Write>(self, out: &mut W) -> Result<()> {
        match self {
            Self::Parse { file, output } => {
                let app = read_app(&file).await?;
                match output {
                    Output::Json => {
                        serde_json::to_writer_pretty(&mut *out, &app)?;
                        writeln!(out)?;
                    }
                    Output::Yaml => serde_yaml::to_writer(out, &app)?,
                }
            }

            Self::Values {
                file,
                service,
                predeploy,
            } => {
                let app = read_app(&file).await?;
                let values = match service {
                    Some(name) if !predeploy => translate::emit_helm_values(&app, &name)?,
                    _ => translate::emit_predeploy_values(&app)?,
                };
                serde_yaml::to_writer(out, &values)?;
            }

            Self::ExportV1 { file } => {
                let app = read_app(&file).await?;
                serde_yaml::to_writer(out, &translate::to_v1_document(&app)?)?;
            }

            Self::ExportV2 { file } => {
                let app = read_app(&file).await?;
                out.write_all(translate::v2::to_yaml(&app)?.as_bytes())?;
            }

            Self::Graph { file } => {
                let bytes = read(&file).await?;
                let graph = preview::build_preview_graph(&bytes)
                    .with_context(|| format!("invalid preview manifest {}", file.display()))?;
                let nodes = graph.resolution_order().collect::<Vec<_>>();
                serde_yaml::to_writer(out, &nodes)?;
            }

            Self::Env {
                file,
                namespace,
                env_groups,
                include_secrets,
            } => {
                let app = read_app(&file).await?;
                let groups = FileEnvGroups::load(&env_groups).await?;
                let target = DeploymentTarget::namespace(namespace);
                let env = translate::resolve_env(
                    &app,
                    &target,
                    &groups,
                    translate::ResolveOptions { include_secrets },
                )
                .instrument(info_span!("env", file = %file.display()))
                .await?;

                // Sorted so output is stable across runs.
                for (key, value) in env.into_iter().collect::<BTreeMap<_, _>>() {
                    writeln!(out, "{key}={value}")?;
                }
            }

            Self::Schema => {
                serde_json::to_writer_pretty(&mut *out, &yaml::v2::schema())?;
                writeln!(out)?;
            }
        }
        Ok(())
    }
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

async fn read_app(path: &Path) -> Result<translate::App> {
    let bytes = read(path).await?;
    let app = translate::parse_yaml(&bytes)
        .with_context(|| format!("invalid manifest {}", path.display()))?;
    debug!(app = %app.name, services = app.services.len(), "Parsed manifest");
    Ok(app)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    const MANIFEST: &str = r#"
version: v2
name: shop
env:
  PORT: "8080"
envGroups:
  - name: shared
services:
  api:
    type: web
    run: node index.js
    port: 8080
    domains:
      - name: shop.example.com
predeploy:
  run: ./migrate
"#;

    const GROUPS: &str = r#"
groups:
  - name: shared
    version: 4
    variables: { REGION: us-east-2, PORT: "80" }
    secretVariables: { TOKEN: s3cr3t }
"#;

    fn write(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    fn command(args: &[&str]) -> Command {
        let args = ["porter-app-model"].iter().chain(args);
        Args::try_parse_from(args).unwrap().command
    }

    async fn output(args: &[&str]) -> String {
        let mut out = Vec::new();
        command(args).run(&mut out).await.unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn parses_global_flags() {
        let args = Args::try_parse_from([
            "porter-app-model",
            "--log-level=porter=debug",
            "--log-format=json",
            "schema",
        ])
        .unwrap();
        assert!(matches!(args.log_format, kubert::LogFormat::Json));
        assert!(matches!(args.command, Command::Schema));
    }

    #[test]
    fn rejects_invalid_log_flags() {
        for flag in ["--log-level=porter=loud", "--log-format=xml"] {
            assert!(
                Args::try_parse_from(["porter-app-model", flag, "schema"]).is_err(),
                "{flag}"
            );
        }
    }

    #[test]
    fn values_needs_a_service_or_predeploy() {
        assert!(Args::try_parse_from(["porter-app-model", "values", "app.yaml"]).is_err());
        assert!(Args::try_parse_from([
            "porter-app-model",
            "values",
            "app.yaml",
            "--service=api",
            "--predeploy",
        ])
        .is_err());
    }

    #[tokio::test]
    async fn prints_the_canonical_app() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, "porter.yaml", MANIFEST);
        let file = file.to_str().unwrap();

        let json = output(&["parse", file]).await;
        let app = serde_json::from_str::<serde_json::Value>(&json).unwrap();
        assert_eq!(app["name"], "shop");
        assert_eq!(app["services"]["api"]["port"], 8080);

        let yaml = output(&["parse", file, "--output=yaml"]).await;
        let app = serde_yaml::from_str::<yaml::Value>(&yaml).unwrap();
        assert_eq!(app.get("name"), Some(&yaml::Value::from("shop")));
    }

    #[tokio::test]
    async fn prints_helm_values() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, "porter.yaml", MANIFEST);
        let file = file.to_str().unwrap();

        let values = output(&["values", file, "--service=api"]).await;
        let values = serde_yaml::from_str::<yaml::Value>(&values).unwrap();
        assert_eq!(
            values["ingress"]["hosts"],
            serde_yaml::from_str::<yaml::Value>("[shop.example.com]").unwrap()
        );

        let values = output(&["values", file, "--predeploy"]).await;
        let values = serde_yaml::from_str::<yaml::Value>(&values).unwrap();
        assert_eq!(
            values["container"]["command"],
            yaml::Value::from("./migrate")
        );

        let mut out = Vec::new();
        let err = command(&["values", file, "--service=ghost"])
            .run(&mut out)
            .await
            .unwrap_err();
        assert!(
            err.downcast_ref::<translate::Error>().is_some(),
            "{err:#}"
        );
    }

    #[tokio::test]
    async fn exports_both_dialects() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, "porter.yaml", MANIFEST);
        let file = file.to_str().unwrap();
        let app = translate::parse_yaml(MANIFEST.as_bytes()).unwrap();

        let v2 = output(&["export-v2", file]).await;
        assert_eq!(translate::parse_yaml(v2.as_bytes()).unwrap(), app);

        let v1 = output(&["export-v1", file]).await;
        let reparsed = translate::parse_yaml(v1.as_bytes()).unwrap();
        assert_eq!(reparsed.name, "shop");
        assert_eq!(reparsed.services["api"].port, 8080);
        assert!(reparsed.predeploy.is_some());
    }

    #[tokio::test]
    async fn resolves_env_from_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(&dir, "porter.yaml", MANIFEST);
        let groups = write(&dir, "groups.yaml", GROUPS);
        let (file, groups) = (file.to_str().unwrap(), groups.to_str().unwrap());

        let env = output(&["env", file, "--namespace=default", "--env-groups", groups]).await;
        assert_eq!(env, "PORT=8080\nREGION=us-east-2\n");

        let env = output(&[
            "env",
            file,
            "--namespace=default",
            "--env-groups",
            groups,
            "--include-secrets",
        ])
        .await;
        assert_eq!(env, "PORT=8080\nREGION=us-east-2\nTOKEN=s3cr3t\n");
    }

    #[tokio::test]
    async fn prints_the_graph_in_resolution_order() {
        let dir = tempfile::tempdir().unwrap();
        let file = write(
            &dir,
            "preview.yaml",
            "apps:\n  - name: web\n    depends_on: [db]\naddons:\n  - name: db\n    helm_chart: {name: postgresql}\n",
        );

        let nodes = output(&["graph", file.to_str().unwrap()]).await;
        let nodes = serde_yaml::from_str::<Vec<yaml::Value>>(&nodes).unwrap();
        let names = nodes
            .iter()
            .map(|node| node["name"].as_str().unwrap())
            .collect::<Vec<_>>();
        assert_eq!(names, ["db", "web"]);
        assert_eq!(nodes[0]["driver"], yaml::Value::from("helm"));
    }

    #[tokio::test]
    async fn prints_the_schema() {
        let schema = output(&["schema"]).await;
        let schema = serde_json::from_str::<serde_json::Value>(&schema).unwrap();
        assert!(schema["properties"]["services"].is_object(), "{schema}");
    }

    #[tokio::test]
    async fn reports_unreadable_files() {
        let mut out = Vec::new();
        let err = command(&["parse", "/nonexistent/porter.yaml"])
            .run(&mut out)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read"), "{err:#}");
    }
}
