//! The four Dockerfile templates

use super::{DockerfileSpec, Instruction, TemplateKind};

pub const BASE_IMAGE_USER: &str = "user";

/// Values substituted into every template
#[derive(Debug, Clone)]
pub struct TemplateInputs {
    pub project_name: String,
    pub base_image: String,
    pub timezone: String,
    pub env_dir_name: String,
}

impl TemplateInputs {
    fn workdir(&self) -> String {
        format!("/opt/{}", self.project_name)
    }

    fn timezone_env(&self) -> Vec<(String, String)> {
        vec![("TZ".to_string(), self.timezone.clone())]
    }

    /// Timezone link, project copy and bootstrap profile install shared by project templates
    fn project_preamble(&self) -> Vec<Instruction> {
        vec![
            Instruction::run(
                "ln -snf /usr/share/zoneinfo/$TZ /etc/localtime && echo $TZ > /etc/timezone",
            ),
            Instruction::copy(".", "."),
            Instruction::run(format!("cp ./{}/bashrc /etc/bash.bashrc", self.env_dir_name)),
            Instruction::run("chmod a+rwx /etc/bash.bashrc"),
        ]
    }
}

/// Generic template: installs every manifest line, ignoring individual install failures
pub fn generic(inputs: &TemplateInputs) -> DockerfileSpec {
    let mut steps = inputs.project_preamble();
    steps.push(Instruction::run(format!(
        "cat ./{}/requirements.txt | xargs -L 1 pip3 install; exit 0",
        inputs.env_dir_name
    )));

    DockerfileSpec {
        template: TemplateKind::Generic,
        base_image: inputs.base_image.clone(),
        workdir: inputs.workdir(),
        env: inputs.timezone_env(),
        steps,
    }
}

/// Node build: `npm install`, then a best-effort `npm run build`
pub fn node_framework(inputs: &TemplateInputs) -> DockerfileSpec {
    let mut steps = inputs.project_preamble();
    steps.push(Instruction::run("npm install"));
    steps.push(Instruction::run("npm run build; exit 0"));

    DockerfileSpec {
        template: TemplateKind::NodeFramework,
        base_image: inputs.base_image.clone(),
        workdir: inputs.workdir(),
        env: inputs.timezone_env(),
        steps,
    }
}

pub fn dry(inputs: &TemplateInputs) -> DockerfileSpec {
    DockerfileSpec {
        template: TemplateKind::Dry,
        base_image: inputs.base_image.clone(),
        workdir: inputs.workdir(),
        env: inputs.timezone_env(),
        steps: inputs.project_preamble(),
    }
}

/// Ogre base image with a sudo-capable non-root user protected by `passphrase`
pub fn base_image(inputs: &TemplateInputs, passphrase: &str) -> DockerfileSpec {
    let mut env = inputs.timezone_env();
    env.push(("DEBIAN_FRONTEND".to_string(), "noninteractive".to_string()));

    let steps = vec![
        Instruction::run(
            "ln -snf /usr/share/zoneinfo/$TZ /etc/localtime && echo $TZ > /etc/timezone",
        ),
        Instruction::run(
            "apt-get update && apt-get install -y --no-install-recommends sudo && rm -rf /var/lib/apt/lists/*",
        ),
        Instruction::run(format!(
            "useradd -m -s /bin/bash {user} && echo \"{user}:{passphrase}\" | chpasswd && usermod -aG sudo {user}",
            user = BASE_IMAGE_USER,
            passphrase = passphrase
        )),
        Instruction::copy(
            format!("./{}/bashrc", inputs.env_dir_name),
            "/etc/bash.bashrc",
        ),
        Instruction::run("chmod a+rwx /etc/bash.bashrc"),
        Instruction::User(BASE_IMAGE_USER.to_string()),
    ];

    DockerfileSpec {
        template: TemplateKind::BaseImage,
        base_image: inputs.base_image.clone(),
        workdir: inputs.workdir(),
        env,
        steps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs() -> TemplateInputs {
        TemplateInputs {
            project_name: "webapp".to_string(),
            base_image: "node:20-bookworm".to_string(),
            timezone: "UTC".to_string(),
            env_dir_name: "envdir".to_string(),
        }
    }

    #[test]
    fn test_node_template_builds_with_npm() {
        let rendered = node_framework(&inputs()).render();
        assert!(rendered.starts_with("FROM node:20-bookworm\nENV TZ=UTC\nWORKDIR /opt/webapp\n"));
        assert!(rendered.contains("RUN cp ./envdir/bashrc /etc/bash.bashrc\n"));
        assert!(rendered.ends_with("RUN npm install\nRUN npm run build; exit 0\n"));
        assert!(!rendered.contains("pip3"));
    }

    #[test]
    fn test_dry_template_installs_nothing() {
        let spec = dry(&inputs());
        let rendered = spec.render();
        assert!(!rendered.contains("requirements.txt"));
        assert!(!rendered.contains("npm"));
        assert!(rendered.contains("COPY . .\n"));
        assert_eq!(spec.template, TemplateKind::Dry);
    }

    #[test]
    fn test_base_image_template_creates_user() {
        let rendered = base_image(&inputs(), "correcthorsebattery").render();
        assert!(rendered.contains("echo \"user:correcthorsebattery\" | chpasswd"));
        assert!(rendered.contains("usermod -aG sudo user"));
        assert!(rendered.contains("ENV DEBIAN_FRONTEND=noninteractive\n"));
        assert!(rendered.trim_end().ends_with("USER user"));
    }
}
