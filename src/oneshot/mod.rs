//! One-shot task mode / 单次任务模式
//!
//! Runs a canned set of requests for one task through the same dispatcher
//! the HTTP gateway uses, and renders each result for the terminal.
//! 通过与HTTP网关相同的分发器运行某个任务的预设请求，并将结果渲染到终端。

use clap::Parser;
use serde_json::json;
use std::path::{Path, PathBuf};

use crate::codec::{bytes_to_base64, to_data_url, write_output, EncodingError};
use crate::gateway::config::ConfigArgs;
use crate::gateway::dispatcher::{Dispatcher, TaskOutput, TaskRequest};
use crate::gateway::error::DispatchError;
use crate::inference::{TaskKind, UnknownTask};

pub const COLORED_PHOTO_FILE: &str = "colored-photo.jpg";

/// One-shot command line arguments / 单次任务命令行参数
#[derive(Parser, Debug, Clone)]
#[command(
    name = "hf-task",
    version,
    about = "Run one inference task and print the result\n运行一个推理任务并打印结果"
)]
pub struct TaskArgs {
    /// Task to run / 要运行的任务
    #[arg(
        short,
        long,
        value_name = "NAME",
        value_parser = parse_task,
        help = "chat-completion, classify, translate, text-to-speech, color-photo / 任务名称"
    )]
    pub task: TaskKind,

    /// Override the demo model / 覆盖示例模型
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Override the demo input text / 覆盖示例输入文本
    #[arg(long, value_name = "TEXT")]
    pub text: Option<String>,

    /// Directory for the colored photo / 上色照片的输出目录
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

fn parse_task(s: &str) -> Result<TaskKind, UnknownTask> {
    s.parse()
}

/// Accept the legacy single-dash `-task` spelling
/// 兼容旧的单横线`-task`写法
pub fn normalize_args<I>(args: I) -> Vec<String>
where
    I: IntoIterator<Item = String>,
{
    args.into_iter()
        .map(|a| {
            if a == "-task" {
                "--task".to_string()
            } else if let Some(v) = a.strip_prefix("-task=") {
                format!("--task={}", v)
            } else {
                a
            }
        })
        .collect()
}

/// Canned requests for a task / 任务的示例请求
pub fn demo_requests(task: TaskKind, model: Option<&str>, text: Option<&str>) -> Vec<TaskRequest> {
    let requests = match task {
        TaskKind::ChatCompletion => vec![TaskRequest::new(task, "HuggingFaceH4/zephyr-7b-beta")
            .with_text("The definition of machine learning inference is ")],
        TaskKind::Classify => {
            let sentiment = "cardiffnlp/twitter-roberta-base-sentiment-latest";
            let positive = "I just bought a new camera. It's the best camera I've ever owned!";
            let negative = "I just bought a new camera. It's been a real disappointment.";
            vec![
                TaskRequest::new(task, sentiment).with_text(positive),
                TaskRequest::new(task, sentiment).with_text(negative),
                TaskRequest::new(task, "j-hartmann/emotion-english-distilroberta-base")
                    .with_text(negative),
            ]
        }
        TaskKind::Translate => vec![TaskRequest::new(
            task,
            "facebook/mbart-large-50-many-to-many-mmt",
        )
        .with_text("It's an exciting time to be an AI engineer")
        .with_parameter("src_lang", json!("en_XX"))
        .with_parameter("tgt_lang", json!("hi_IN"))],
        TaskKind::TextToSpeech => vec![TaskRequest::new(task, "facebook/mms-tts")
            .with_text("It's an exciting time to be an A.I. engineer.")],
        TaskKind::ImageToImage => {
            vec![TaskRequest::new(task, "ghoskno/Color-Canny-Controlnet-model")]
        }
    };

    requests
        .into_iter()
        .map(|mut r| {
            if let Some(m) = model {
                r.model = m.to_string();
            }
            if let Some(t) = text {
                r.text = Some(t.to_string());
            }
            r
        })
        .collect()
}

/// Executes one-shot tasks / 执行单次任务
pub struct OneShotRunner {
    dispatcher: Dispatcher,
    output_dir: PathBuf,
}

impl OneShotRunner {
    pub fn new(dispatcher: Dispatcher, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            dispatcher,
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Run requests in order, handing each rendered block to `emit` as soon
    /// as it is ready. Stops at the first failure; blocks already emitted stay emitted.
    /// 按顺序执行请求，每个结果渲染后立即交给`emit`，遇到首个失败即停止。
    pub async fn run<F>(
        &self,
        requests: Vec<TaskRequest>,
        mut emit: F,
    ) -> Result<(), DispatchError>
    where
        F: FnMut(String),
    {
        for req in requests {
            let task = req.task;
            let output = self.dispatcher.dispatch(req).await?;
            emit(self.render(task, output).await?);
        }
        Ok(())
    }

    async fn render(&self, task: TaskKind, output: TaskOutput) -> Result<String, DispatchError> {
        let value = match output {
            TaskOutput::Structured(s) => serde_json::to_value(&s).map_err(EncodingError::from)?,
            TaskOutput::Binary(b) => {
                let mut value = json!({
                    "content_type": b.content_type,
                    "bytes": b.len(),
                    "base64": bytes_to_base64(&b.bytes),
                });
                if task == TaskKind::ImageToImage {
                    let path = self.output_dir.join(COLORED_PHOTO_FILE);
                    write_output(&path, &b.bytes).await?;
                    value["path"] = json!(path.display().to_string());
                    value["data_url"] = json!(to_data_url(&b.content_type, &b.bytes));
                }
                value
            }
        };
        Ok(serde_json::to_string_pretty(&value).map_err(EncodingError::from)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::config::ColorPhotoConfig;
    use crate::inference::StubInferenceClient;
    use serde_json::Value;
    use std::sync::Arc;

    fn runner(
        stub: Arc<StubInferenceClient>,
        color: ColorPhotoConfig,
        out: &Path,
    ) -> OneShotRunner {
        OneShotRunner::new(Dispatcher::new(stub, color), out)
    }

    #[test]
    fn test_normalize_legacy_task_flag() {
        let args = normalize_args(
            ["hf-task", "-task", "classify", "--model", "m"]
                .iter()
                .map(|s| s.to_string()),
        );
        assert_eq!(args, vec!["hf-task", "--task", "classify", "--model", "m"]);

        let args = normalize_args(["hf-task", "-task=translate"].iter().map(|s| s.to_string()));
        assert_eq!(args[1], "--task=translate");
    }

    #[test]
    fn test_task_args_parse() {
        let args = TaskArgs::try_parse_from(normalize_args(
            ["hf-task", "-task", "color-photo"].iter().map(|s| s.to_string()),
        ))
        .unwrap();
        assert_eq!(args.task, TaskKind::ImageToImage);

        assert!(TaskArgs::try_parse_from(["hf-task", "--task", "summarize"]).is_err());
        assert!(TaskArgs::try_parse_from(["hf-task"]).is_err());
    }

    #[test]
    fn test_demo_requests_are_valid_and_overridable() {
        for task in TaskKind::ALL {
            let requests = demo_requests(task, None, None);
            assert!(!requests.is_empty());
            for r in requests {
                assert!(r.validate().is_ok());
            }
        }
        assert_eq!(demo_requests(TaskKind::Classify, None, None).len(), 3);

        let r = demo_requests(TaskKind::TextToSpeech, Some("espnet/kan-bayashi"), Some("hi"));
        assert_eq!(r[0].model, "espnet/kan-bayashi");
        assert_eq!(r[0].text.as_deref(), Some("hi"));
    }

    #[tokio::test]
    async fn test_run_classify_prints_labels() {
        let dir = tempfile::tempdir().unwrap();
        let stub = Arc::new(StubInferenceClient::default());
        let runner = runner(stub.clone(), ColorPhotoConfig::default(), dir.path());

        let mut out = Vec::new();
        let requests = demo_requests(TaskKind::Classify, None, None);
        runner.run(requests, |b| out.push(b)).await.unwrap();
        assert_eq!(out.len(), 3);
        assert_eq!(stub.call_count(), 3);
        let first: Value = serde_json::from_str(&out[0]).unwrap();
        assert_eq!(first[0]["label"], "positive");
    }

    #[tokio::test]
    async fn test_run_color_photo_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.jpg");
        std::fs::write(&source, [0xFF, 0xD8]).unwrap();
        let stub = Arc::new(StubInferenceClient::default());
        let color = ColorPhotoConfig {
            source_image: source,
            ..Default::default()
        };
        let runner = runner(stub, color, dir.path());

        let mut out = Vec::new();
        let requests = demo_requests(TaskKind::ImageToImage, None, None);
        runner.run(requests, |b| out.push(b)).await.unwrap();
        let value: Value = serde_json::from_str(&out[0]).unwrap();
        let written = std::fs::read(dir.path().join(COLORED_PHOTO_FILE)).unwrap();
        assert_eq!(value["bytes"], written.len());
        assert_eq!(value["content_type"], "image/jpg");
        assert_eq!(value["data_url"], "data:image/jpg;base64,/9j/2Q==");
    }

    #[tokio::test]
    async fn test_run_color_photo_missing_output_dir_is_encoding_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("old.jpg");
        std::fs::write(&source, [0xFF, 0xD8]).unwrap();
        let color = ColorPhotoConfig {
            source_image: source,
            ..Default::default()
        };
        let runner = runner(
            Arc::new(StubInferenceClient::default()),
            color,
            &dir.path().join("missing"),
        );

        let requests = demo_requests(TaskKind::ImageToImage, None, None);
        let err = runner.run(requests, |_| {}).await.unwrap_err();
        assert!(matches!(err, DispatchError::Encoding(_)));
    }

    #[tokio::test]
    async fn test_run_speech_prints_base64() {
        let dir = tempfile::tempdir().unwrap();
        let runner = runner(
            Arc::new(StubInferenceClient::default()),
            ColorPhotoConfig::default(),
            dir.path(),
        );
        let mut out = Vec::new();
        let requests = demo_requests(TaskKind::TextToSpeech, None, None);
        runner.run(requests, |b| out.push(b)).await.unwrap();
        let value: Value = serde_json::from_str(&out[0]).unwrap();
        assert_eq!(value["base64"], "UklGRg==");
        assert_eq!(value["content_type"], "audio/wav");
        assert!(value.get("path").is_none());
        assert!(value.get("data_url").is_none());
    }

    #[tokio::test]
    async fn test_run_emits_results_before_a_later_failure() {
        let dir = tempfile::tempdir().unwrap();
        let color = ColorPhotoConfig {
            source_image: dir.path().join("missing.jpg"),
            ..Default::default()
        };
        let stub = Arc::new(StubInferenceClient::default());
        let runner = runner(stub.clone(), color, dir.path());

        let mut requests = demo_requests(TaskKind::Classify, None, None);
        requests.truncate(2);
        requests.extend(demo_requests(TaskKind::ImageToImage, None, None));

        let mut out = Vec::new();
        let err = runner.run(requests, |b| out.push(b)).await.unwrap_err();
        assert!(matches!(err, DispatchError::Encoding(_)));
        assert_eq!(out.len(), 2);
        assert_eq!(stub.call_count(), 2);
    }
}
