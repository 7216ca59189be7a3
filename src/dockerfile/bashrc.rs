//! Bootstrap shell profile installed as `/etc/bash.bashrc` in generated images

use super::SynthesisError;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info};

pub const BASHRC_FILE: &str = "bashrc";

pub const BASHRC: &str = r#"
_python_argcomplete() {
    local IFS=$'\013'
    local SUPPRESS_SPACE=0
    if compopt +o nospace 2> /dev/null; then
        SUPPRESS_SPACE=1
    fi
    COMPREPLY=( $(IFS="$IFS" \
                  COMP_LINE="$COMP_LINE" \
                  COMP_POINT="$COMP_POINT" \
                  COMP_TYPE="$COMP_TYPE" \
                  _ARGCOMPLETE_COMP_WORDBREAKS="$COMP_WORDBREAKS" \
                  _ARGCOMPLETE=1 \
                  _ARGCOMPLETE_SUPPRESS_SPACE=$SUPPRESS_SPACE \
                  "$1" 8>&1 9>&2 1>/dev/null 2>/dev/null) )
    if [[ $? != 0 ]]; then
        unset COMPREPLY
    elif [[ $SUPPRESS_SPACE == 1 ]] && [[ "$COMPREPLY" =~ [=/:]$ ]]; then
        compopt -o nospace
    fi
}
complete -o nospace -o default -o bashdefault -F _python_argcomplete "az"

[ -z "$PS1" ] && return

export PS1="\[\e[31m\]ogre\[\e[m\] \[\e[33m\]\w\[\e[m\] > "
export TERM=xterm-256color
alias grep="grep --color=auto"
alias ls="ls --color=auto"

echo -e "\e[1;36m"
cat<<'OGRE'
  ___   __ _ _ __ ___
 / _ \ / _` | '__/ _ \
| (_) | (_| | | |  __/
 \___/ \__, |_|  \___|
       |___/
OGRE
echo -e "\e[0;33m"

if [[ $EUID -eq 0 ]]; then
  cat <<WARN
WARNING: You are running this container as root, which can cause new files in
mounted volumes to be created as the root user on your host machine.

To avoid this, run the container by specifying your user's userid:

$ docker run -u \$(id -u):\$(id -g) args...
WARN
else
  cat <<EXPL
You are running this container as user with ID $(id -u) and group $(id -g),
which should map to the ID and group for your user on the Docker host. Great!
EXPL
fi

alias python="python3"
"#;

/// Build provenance echoed when an interactive shell starts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WelcomeInfo {
    pub product: String,
    pub version: String,
    pub build_date: String,
    pub repository: String,
    pub commit: String,
    pub commit_author: String,
}

impl WelcomeInfo {
    /// Git fields come from the project's repository and stay empty when git is unavailable
    pub async fn collect(project_root: &Path) -> Self {
        Self {
            product: "miniogre".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            build_date: chrono::Local::now().format("%Y-%m-%d-%H:%M:%S").to_string(),
            repository: git_field(project_root, &["remote", "get-url", "origin"]).await,
            commit: git_field(project_root, &["log", "-1", "--pretty=%h"]).await,
            commit_author: git_field(project_root, &["log", "-1", "--pretty=format:%ae"]).await,
        }
    }

    pub fn render(&self) -> String {
        [
            ("PRODUCT", &self.product),
            ("VERSION", &self.version),
            ("BUILD_DATE", &self.build_date),
            ("REPOSITORY", &self.repository),
            ("COMMIT", &self.commit),
            ("COMMIT_AUTHOR", &self.commit_author),
        ]
        .iter()
        .map(|(key, value)| format!("echo \"{} = {}\"\n", key, shell_safe(value)))
        .collect()
    }
}

async fn git_field(project_root: &Path, args: &[&str]) -> String {
    match Command::new("git")
        .args(args)
        .current_dir(project_root)
        .output()
        .await
    {
        Ok(output) if output.status.success() => {
            String::from_utf8_lossy(&output.stdout).trim().to_string()
        }
        _ => {
            debug!(args = ?args, "git field unavailable");
            String::new()
        }
    }
}

/// Drops characters that would be interpreted inside a double-quoted echo
fn shell_safe(value: &str) -> String {
    value
        .chars()
        .filter(|c| !matches!(c, '"' | '$' | '`' | '\\' | '\n' | '\r'))
        .collect()
}

/// Writes `<env_dir>/bashrc`: a project-root `bashrc` verbatim, or the built-in profile
/// followed by the welcome block. Returns the path and whether the project's file was used.
pub fn write_bashrc(
    project_root: &Path,
    env_dir: &Path,
    welcome: &WelcomeInfo,
) -> Result<(PathBuf, bool), SynthesisError> {
    let target = env_dir.join(BASHRC_FILE);
    let existing = project_root.join(BASHRC_FILE);

    if existing.is_file() {
        info!(path = %existing.display(), "bashrc exists, copying it");
        fs::copy(&existing, &target).map_err(|source| SynthesisError::Copy {
            from: existing.clone(),
            to: target.clone(),
            source,
        })?;
        return Ok((target, true));
    }

    let content = format!("{}\n{}", BASHRC, welcome.render());
    fs::write(&target, content).map_err(|source| SynthesisError::Write {
        path: target.clone(),
        source,
    })?;
    debug!(path = %target.display(), "Built-in bashrc written");
    Ok((target, false))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn welcome() -> WelcomeInfo {
        WelcomeInfo {
            product: "miniogre".to_string(),
            version: "0.3.0".to_string(),
            build_date: "2024-01-01-00:00:00".to_string(),
            repository: "git@github.com:acme/demo.git".to_string(),
            commit: "abc1234".to_string(),
            commit_author: "dev@acme.io".to_string(),
        }
    }

    #[test]
    fn test_welcome_block() {
        let block = welcome().render();
        assert!(block.contains("echo \"PRODUCT = miniogre\"\n"));
        assert!(block.contains("echo \"COMMIT = abc1234\"\necho \"COMMIT_AUTHOR = dev@acme.io\"\n"));
    }

    #[test]
    fn test_welcome_values_are_shell_safe() {
        let mut info = welcome();
        info.commit_author = "$(rm -rf /)\"`".to_string();
        assert!(info.render().contains("echo \"COMMIT_AUTHOR = (rm -rf /)\"\n"));
    }

    #[test]
    fn test_builtin_profile_written() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("ogre_dir");
        fs::create_dir(&env).unwrap();

        let (path, copied) = write_bashrc(temp.path(), &env, &welcome()).unwrap();
        let content = fs::read_to_string(path).unwrap();
        assert!(!copied);
        assert!(content.contains("alias python=\"python3\""));
        assert!(content.contains("echo \"VERSION = 0.3.0\""));
    }

    #[test]
    fn test_project_bashrc_copied_verbatim() {
        let temp = TempDir::new().unwrap();
        let env = temp.path().join("ogre_dir");
        fs::create_dir(&env).unwrap();
        fs::write(temp.path().join("bashrc"), "export CUSTOM=1\n").unwrap();

        let (path, copied) = write_bashrc(temp.path(), &env, &welcome()).unwrap();
        assert!(copied);
        assert_eq!(fs::read_to_string(path).unwrap(), "export CUSTOM=1\n");
    }

    #[tokio::test]
    async fn test_collect_outside_git_repository() {
        let temp = TempDir::new().unwrap();
        let info = WelcomeInfo::collect(temp.path()).await;
        assert_eq!(info.product, "miniogre");
        assert!(info.commit.is_empty());
    }
}
