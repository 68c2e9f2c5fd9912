//! Session - user gestures as commands.
//!
//! Holds the state the page keeps between gestures (selected file, URL,
//! prompt, theme) and routes each [`Command`] to the renderer, the
//! transcript writer or the config.

use crate::config::{GlanceConfig, Theme};
use crate::error::{GlanceError, Result};
use crate::presenter::Presenter;
use crate::renderer::StreamRenderer;
use crate::transcript::Transcript;
use crate::transport::{HttpTransport, Transport};
use crate::types::{ImageInput, Outcome};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Pick a local image (file picker / drop)
    SelectFile(PathBuf),
    /// Forget the selected file and URL
    ClearImage,
    /// Type an image URL
    SetUrl(String),
    SetPrompt(String),
    /// Press the analyze button
    Analyze,
    /// Save the displayed prompt and answer
    Save,
    ToggleTheme,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Selected(String),
    Cleared,
    PromptSet,
    Analyzed(Outcome),
    Saved(PathBuf),
    NothingToSave,
    ThemeChanged(Theme),
}

pub struct Session<P: Presenter> {
    config: GlanceConfig,
    config_path: Option<PathBuf>,
    renderer: StreamRenderer,
    presenter: P,
    input: ImageInput,
    prompt: String,
}

impl<P: Presenter> Session<P> {
    pub fn new(
        config: GlanceConfig,
        config_path: Option<PathBuf>,
        transport: Arc<dyn Transport>,
        mut presenter: P,
    ) -> Self {
        let renderer = StreamRenderer::new(transport, config.sentinel.clone());
        presenter.set_theme(config.theme);
        Self {
            config,
            config_path,
            renderer,
            presenter,
            input: ImageInput::default(),
            prompt: String::new(),
        }
    }

    /// Session talking to the configured HTTP endpoint
    pub fn connect(config: GlanceConfig, config_path: Option<PathBuf>, presenter: P) -> Result<Self> {
        let transport = HttpTransport::from_config(&config)?;
        Ok(Self::new(config, config_path, Arc::new(transport), presenter))
    }

    pub fn config(&self) -> &GlanceConfig {
        &self.config
    }

    pub fn input(&self) -> &ImageInput {
        &self.input
    }

    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    pub fn presenter(&self) -> &P {
        &self.presenter
    }

    pub async fn dispatch(&mut self, command: Command) -> Result<Reply> {
        match command {
            Command::SelectFile(path) => {
                if !path.is_file() {
                    return Err(GlanceError::Validation(format!(
                        "File not found: {}",
                        path.display()
                    )));
                }
                self.input.file = Some(path);
                Ok(Reply::Selected(self.input.describe()))
            }
            Command::ClearImage => {
                self.input = ImageInput::default();
                Ok(Reply::Cleared)
            }
            Command::SetUrl(url) => {
                let url = url.trim().to_string();
                self.input.url = if url.is_empty() { None } else { Some(url) };
                Ok(Reply::Selected(self.input.describe()))
            }
            Command::SetPrompt(prompt) => {
                self.prompt = prompt;
                Ok(Reply::PromptSet)
            }
            Command::Analyze => {
                let outcome = self
                    .renderer
                    .analyze(&self.prompt, &self.input, &mut self.presenter)
                    .await;
                Ok(Reply::Analyzed(outcome))
            }
            Command::Save => self.save(),
            Command::ToggleTheme => self.toggle_theme(),
        }
    }

    fn save(&self) -> Result<Reply> {
        let displayed = self.presenter.displayed();
        if displayed.prompt.is_empty() && displayed.answer.is_empty() {
            return Ok(Reply::NothingToSave);
        }
        let path = Transcript::new(&displayed).save(&self.config.save_dir)?;
        Ok(Reply::Saved(path))
    }

    fn toggle_theme(&mut self) -> Result<Reply> {
        self.config.theme = self.config.theme.toggled();
        self.presenter.set_theme(self.config.theme);

        if let Some(path) = &self.config_path {
            // Only the theme is written back; endpoint overrides stay in memory
            let mut stored = if path.exists() {
                GlanceConfig::from_file(path)?
            } else {
                GlanceConfig::default()
            };
            stored.theme = self.config.theme;
            stored.to_file(path)?;
            tracing::debug!("Stored theme {} in {}", stored.theme.as_str(), path.display());
        }

        Ok(Reply::ThemeChanged(self.config.theme))
    }
}

/// What a line typed in interactive mode asks for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineAction {
    Run(Vec<Command>),
    Help,
    Exit,
    Empty,
    Unknown(String),
}

/// Parse one line of interactive input. Plain text is a prompt to analyze.
pub fn parse_line(line: &str) -> LineAction {
    let line = line.trim();
    if line.is_empty() {
        return LineAction::Empty;
    }

    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    match head {
        "exit" | "quit" if rest.is_empty() => LineAction::Exit,
        "/help" => LineAction::Help,
        "/file" if !rest.is_empty() => {
            LineAction::Run(vec![Command::SelectFile(PathBuf::from(rest))])
        }
        "/url" if !rest.is_empty() => LineAction::Run(vec![Command::SetUrl(rest.to_string())]),
        "/clear" => LineAction::Run(vec![Command::ClearImage]),
        "/analyze" => LineAction::Run(vec![Command::Analyze]),
        "/save" => LineAction::Run(vec![Command::Save]),
        "/theme" => LineAction::Run(vec![Command::ToggleTheme]),
        _ if head.starts_with('/') => LineAction::Unknown(line.to_string()),
        _ => LineAction::Run(vec![
            Command::SetPrompt(line.to_string()),
            Command::Analyze,
        ]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::presenter::MemoryPresenter;
    use crate::transport::ByteStream;
    use crate::types::{AnalyzeRequest, ImageSource, NO_IMAGE_MESSAGE};
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures_util::StreamExt;
    use std::sync::Mutex;

    /// Answers every request with the same body and records what was sent
    struct FixedTransport {
        body: &'static str,
        sent: Mutex<Vec<AnalyzeRequest>>,
    }

    #[async_trait]
    impl Transport for FixedTransport {
        async fn open(&self, request: &AnalyzeRequest) -> Result<ByteStream> {
            self.sent.lock().unwrap().push(request.clone());
            let chunks: Vec<Result<Bytes>> = vec![Ok(Bytes::from_static(self.body.as_bytes()))];
            Ok(futures_util::stream::iter(chunks).boxed())
        }
    }

    fn session(body: &'static str, save_dir: PathBuf) -> (Session<MemoryPresenter>, Arc<FixedTransport>) {
        let transport = Arc::new(FixedTransport {
            body,
            sent: Mutex::new(Vec::new()),
        });
        let config = GlanceConfig {
            save_dir,
            ..GlanceConfig::default()
        };
        let session = Session::new(config, None, transport.clone(), MemoryPresenter::new());
        (session, transport)
    }

    #[tokio::test]
    async fn test_prompt_and_url_then_analyze() {
        let (mut session, transport) = session("A lighthouse.<eos>", PathBuf::from("."));

        session.dispatch(Command::SetUrl("https://example.com/l.jpg".to_string())).await.unwrap();
        session.dispatch(Command::SetPrompt("What is this?".to_string())).await.unwrap();
        let reply = session.dispatch(Command::Analyze).await.unwrap();

        match reply {
            Reply::Analyzed(outcome) => {
                assert_eq!(outcome.snapshot().unwrap().answer, "A lighthouse.");
            }
            other => panic!("unexpected reply: {:?}", other),
        }
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].source, ImageSource::Url("https://example.com/l.jpg".to_string()));
        assert_eq!(sent[0].prompt, "What is this?");
    }

    #[tokio::test]
    async fn test_analyze_without_image_is_invalid() {
        let (mut session, transport) = session("unused", PathBuf::from("."));

        let reply = session.dispatch(Command::Analyze).await.unwrap();

        assert_eq!(reply, Reply::Analyzed(Outcome::Invalid(NO_IMAGE_MESSAGE.to_string())));
        assert!(transport.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_selected_file_wins_over_url() {
        let dir = tempfile::tempdir().unwrap();
        let image = dir.path().join("cat.jpg");
        std::fs::write(&image, b"jpeg").unwrap();
        let (mut session, transport) = session("ok", dir.path().to_path_buf());

        session.dispatch(Command::SetUrl("https://example.com/dog.png".to_string())).await.unwrap();
        let reply = session.dispatch(Command::SelectFile(image.clone())).await.unwrap();
        assert_eq!(reply, Reply::Selected("Selected: cat.jpg".to_string()));

        session.dispatch(Command::Analyze).await.unwrap();
        assert_eq!(transport.sent.lock().unwrap()[0].source, ImageSource::File(image));
    }

    #[tokio::test]
    async fn test_select_missing_file_rejected() {
        let (mut session, _) = session("ok", PathBuf::from("."));
        let result = session
            .dispatch(Command::SelectFile(PathBuf::from("/no/such/image.png")))
            .await;
        assert!(matches!(result, Err(GlanceError::Validation(_))));
        assert!(session.input().is_empty());
    }

    #[tokio::test]
    async fn test_save_writes_displayed_result() {
        let dir = tempfile::tempdir().unwrap();
        let (mut session, _) = session("Two cats.<eos>", dir.path().to_path_buf());

        assert_eq!(session.dispatch(Command::Save).await.unwrap(), Reply::NothingToSave);

        session.dispatch(Command::SetUrl("u".to_string())).await.unwrap();
        session.dispatch(Command::SetPrompt("How many?".to_string())).await.unwrap();
        session.dispatch(Command::Analyze).await.unwrap();

        let path = match session.dispatch(Command::Save).await.unwrap() {
            Reply::Saved(path) => path,
            other => panic!("unexpected reply: {:?}", other),
        };
        let contents = std::fs::read_to_string(path).unwrap();
        assert!(contents.starts_with("Analysis Result ("));
        assert!(contents.ends_with("Prompt: How many?\n\nAnswer: Two cats."));
    }

    #[tokio::test]
    async fn test_toggle_theme_persists_to_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".glance.json");
        GlanceConfig::default().to_file(&config_path).unwrap();

        let transport = Arc::new(FixedTransport {
            body: "",
            sent: Mutex::new(Vec::new()),
        });
        let mut session = Session::new(
            GlanceConfig::default(),
            Some(config_path.clone()),
            transport,
            MemoryPresenter::new(),
        );

        let reply = session.dispatch(Command::ToggleTheme).await.unwrap();

        assert_eq!(reply, Reply::ThemeChanged(Theme::Dark));
        assert_eq!(session.presenter().theme, Theme::Dark);
        assert_eq!(GlanceConfig::from_file(&config_path).unwrap().theme, Theme::Dark);
    }

    #[tokio::test]
    async fn test_toggle_theme_keeps_endpoint_override_out_of_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".glance.json");
        let on_disk = GlanceConfig {
            save_dir: PathBuf::from("results"),
            ..GlanceConfig::default()
        };
        on_disk.to_file(&config_path).unwrap();

        let transport = Arc::new(FixedTransport {
            body: "",
            sent: Mutex::new(Vec::new()),
        });
        let overridden = GlanceConfig {
            endpoint: "http://cli-override:9999".to_string(),
            ..on_disk.clone()
        };
        let mut session = Session::new(
            overridden,
            Some(config_path.clone()),
            transport,
            MemoryPresenter::new(),
        );

        session.dispatch(Command::ToggleTheme).await.unwrap();

        let stored = GlanceConfig::from_file(&config_path).unwrap();
        assert_eq!(stored.theme, Theme::Dark);
        assert_eq!(stored.endpoint, "http://127.0.0.1:5000");
        assert_eq!(stored.save_dir, PathBuf::from("results"));
        assert_eq!(session.config().endpoint, "http://cli-override:9999");
    }

    #[tokio::test]
    async fn test_toggle_theme_recreates_missing_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join(".glance.json");

        let transport = Arc::new(FixedTransport {
            body: "",
            sent: Mutex::new(Vec::new()),
        });
        let config = GlanceConfig {
            endpoint: "http://cli-override:9999".to_string(),
            ..GlanceConfig::default()
        };
        let mut session = Session::new(config, Some(config_path.clone()), transport, MemoryPresenter::new());

        session.dispatch(Command::ToggleTheme).await.unwrap();

        let stored = GlanceConfig::from_file(&config_path).unwrap();
        assert_eq!(stored.theme, Theme::Dark);
        assert_eq!(stored.endpoint, "http://127.0.0.1:5000");
    }

    #[test]
    fn test_parse_line() {
        assert_eq!(parse_line("  "), LineAction::Empty);
        assert_eq!(parse_line("exit"), LineAction::Exit);
        assert_eq!(parse_line("/help"), LineAction::Help);
        assert_eq!(
            parse_line("/file  photos/my cat.png "),
            LineAction::Run(vec![Command::SelectFile(PathBuf::from("photos/my cat.png"))])
        );
        assert_eq!(
            parse_line("/url https://example.com/a.png"),
            LineAction::Run(vec![Command::SetUrl("https://example.com/a.png".to_string())])
        );
        assert_eq!(
            parse_line("Describe the scene"),
            LineAction::Run(vec![
                Command::SetPrompt("Describe the scene".to_string()),
                Command::Analyze,
            ])
        );
        assert_eq!(parse_line("/file"), LineAction::Unknown("/file".to_string()));
        assert_eq!(parse_line("/bogus"), LineAction::Unknown("/bogus".to_string()));
    }
}
