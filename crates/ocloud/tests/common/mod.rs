use assert_cmd::Command;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// 一時ディレクトリに設定ファイルを置いて ocloud を実行するためのヘルパー
pub struct TestProject {
    pub root: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        Self { root }
    }

    pub fn write_config(&self, content: &str) {
        fs::write(self.config_path(), content).unwrap();
    }

    pub fn config_path(&self) -> PathBuf {
        self.root.path().join("ocloud.yaml")
    }

    /// 環境変数の影響を受けない ocloud コマンド
    #[allow(deprecated)]
    pub fn command(&self) -> Command {
        let mut cmd = Command::cargo_bin("ocloud").unwrap();
        cmd.current_dir(self.root.path())
            .env("OCLOUD_CONFIG_PATH", self.config_path())
            .env("HOME", self.root.path())
            .env("NO_COLOR", "1")
            .env_remove("XDG_CONFIG_HOME")
            .env_remove("RUST_LOG");
        for var in [
            "OCLOUD_COMPARTMENT_ID",
            "OCLOUD_REGION",
            "OCLOUD_ENDPOINT",
            "OCLOUD_AUTH_TOKEN",
            "OCLOUD_WORKERS",
            "OCLOUD_RATE_PER_SEC",
            "OCLOUD_RATE_BURST",
            "OCLOUD_ENRICHMENT_POLICY",
        ] {
            cmd.env_remove(var);
        }
        cmd
    }
}
