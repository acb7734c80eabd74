use porter_app_model_core::{Build, BuildMethod, Error, Result};

/// The flat set of build fields both dialects write, before `method` picks which ones matter.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct BuildParts {
    pub context: String,
    pub method: String,
    pub builder: String,
    pub buildpacks: Vec<String>,
    pub dockerfile: String,
    pub image: String,
}

// === impl BuildParts ===

impl BuildParts {
    /// Returns `true` when nothing but `image` is set meaningfully, so the build only names an
    /// existing image.
    pub(crate) fn is_image_only(&self) -> bool {
        !self.image.is_empty()
            && (self.context.is_empty() || self.context == Build::DEFAULT_CONTEXT)
            && (self.method.is_empty() || self.method == "registry")
            && self.builder.is_empty()
            && self.buildpacks.is_empty()
            && self.dockerfile.is_empty()
    }

    /// Checks that the fields `method` requires are set. Fields belonging to other methods are
    /// dropped.
    pub(crate) fn into_build(self, path: &str) -> Result<Build> {
        let context = if self.context.is_empty() {
            Build::DEFAULT_CONTEXT.to_string()
        } else {
            self.context
        };

        let method = match self.method.as_str() {
            "" => return Err(Error::missing(format!("{path}.method"))),
            "pack" => BuildMethod::Pack {
                builder: required(path, "builder", self.builder)?,
                buildpacks: self.buildpacks,
            },
            "docker" => BuildMethod::Docker {
                dockerfile: required(path, "dockerfile", self.dockerfile)?,
            },
            "registry" => BuildMethod::Registry {
                image: required(path, "image", self.image)?,
            },
            other => {
                return Err(Error::invalid_value(
                    format!("{path}.method"),
                    format!("{other:?}"),
                    "one of pack, docker, registry",
                ))
            }
        };

        Ok(Build { context, method })
    }
}

impl From<&Build> for BuildParts {
    fn from(build: &Build) -> Self {
        let mut parts = Self {
            context: build.context.clone(),
            method: build.method.as_str().to_string(),
            ..Default::default()
        };
        match &build.method {
            BuildMethod::Pack {
                builder,
                buildpacks,
            } => {
                parts.builder = builder.clone();
                parts.buildpacks = buildpacks.clone();
            }
            BuildMethod::Docker { dockerfile } => parts.dockerfile = dockerfile.clone(),
            BuildMethod::Registry { image } => parts.image = image.clone(),
        }
        parts
    }
}

fn required(path: &str, field: &str, value: String) -> Result<String> {
    if value.is_empty() {
        return Err(Error::missing(format!("{path}.{field}")));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_conditions_fields() {
        let pack = BuildParts {
            method: "pack".into(),
            builder: "heroku/buildpacks:20".into(),
            buildpacks: vec!["heroku/nodejs".into()],
            dockerfile: "ignored".into(),
            ..Default::default()
        };
        assert_eq!(
            pack.into_build("build").unwrap(),
            Build {
                context: ".".into(),
                method: BuildMethod::Pack {
                    builder: "heroku/buildpacks:20".into(),
                    buildpacks: vec!["heroku/nodejs".into()],
                },
            }
        );

        let docker = BuildParts {
            context: "./api".into(),
            method: "docker".into(),
            ..Default::default()
        };
        assert!(matches!(
            docker.into_build("build"),
            Err(Error::MissingRequired { ref path }) if path == "build.dockerfile"
        ));
    }

    #[test]
    fn method_is_required() {
        let parts = BuildParts {
            dockerfile: "Dockerfile".into(),
            ..Default::default()
        };
        assert!(matches!(
            parts.into_build("build"),
            Err(Error::MissingRequired { ref path }) if path == "build.method"
        ));

        let parts = BuildParts {
            method: "nix".into(),
            ..Default::default()
        };
        assert!(matches!(
            parts.into_build("build"),
            Err(Error::InvalidValue { ref field, .. }) if field == "build.method"
        ));
    }

    #[test]
    fn detects_image_only_builds() {
        let parts = BuildParts {
            method: "registry".into(),
            image: "nginx:1.25".into(),
            ..Default::default()
        };
        assert!(parts.is_image_only());

        let parts = BuildParts {
            context: ".".into(),
            image: "nginx:1.25".into(),
            ..Default::default()
        };
        assert!(parts.is_image_only());

        let parts = BuildParts {
            method: "docker".into(),
            dockerfile: "Dockerfile".into(),
            image: "nginx:1.25".into(),
            ..Default::default()
        };
        assert!(!parts.is_image_only());
    }
}
