use std::path::PathBuf;

use anyhow::Context;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;

use crate::application::ports::prompt_port::{PromptPort, QuickPickItem};

/// Line-oriented prompts over a reader/writer pair (stdin/stdout in the CLI).
///
/// End of input or an empty answer counts as a dismissed dialog.
pub struct TerminalPrompt<R, W> {
    io: Mutex<(BufReader<R>, W)>,
}

impl TerminalPrompt<tokio::io::Stdin, tokio::io::Stdout> {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> TerminalPrompt<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            io: Mutex::new((BufReader::new(reader), writer)),
        }
    }

    pub fn into_inner(self) -> (R, W) {
        let (reader, writer) = self.io.into_inner();
        (reader.into_inner(), writer)
    }

    async fn ask(&self, text: &str) -> anyhow::Result<Option<String>> {
        let mut io = self.io.lock().await;
        let (reader, writer) = &mut *io;
        writer.write_all(text.as_bytes()).await?;
        writer.flush().await?;
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    async fn say(&self, text: &str) -> anyhow::Result<()> {
        let mut io = self.io.lock().await;
        io.1.write_all(text.as_bytes()).await?;
        Ok(())
    }
}

fn numbered<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    let mut out = String::new();
    for (i, label) in labels.enumerate() {
        out.push_str(&format!("  {}) {}\n", i + 1, label));
    }
    out
}

#[async_trait]
impl<R, W> PromptPort for TerminalPrompt<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn prompt_choice(
        &self,
        title: &str,
        options: &[String],
    ) -> anyhow::Result<Option<String>> {
        let menu = numbered(options.iter().map(String::as_str));
        loop {
            self.say(&format!("{title}\n{menu}  0) Cancel\n")).await?;
            let Some(answer) = self.ask("> ").await? else {
                return Ok(None);
            };
            let answer = answer.trim();
            if answer.is_empty() || answer == "0" {
                return Ok(None);
            }
            if let Ok(n) = answer.parse::<usize>() {
                if let Some(option) = n.checked_sub(1).and_then(|i| options.get(i)) {
                    return Ok(Some(option.clone()));
                }
            } else if let Some(option) = options.iter().find(|o| o.eq_ignore_ascii_case(answer)) {
                return Ok(Some(option.clone()));
            }
        }
    }

    async fn prompt_text(
        &self,
        title: &str,
        initial_value: Option<&str>,
    ) -> anyhow::Result<Option<String>> {
        let question = match initial_value {
            Some(initial) => format!("{title} [{initial}]: "),
            None => format!("{title}: "),
        };
        let Some(answer) = self.ask(&question).await? else {
            return Ok(None);
        };
        if answer.trim().is_empty() {
            return Ok(initial_value.map(str::to_string));
        }
        Ok(Some(answer))
    }

    async fn prompt_multi_select(
        &self,
        title: &str,
        options: &[QuickPickItem],
    ) -> anyhow::Result<Option<Vec<QuickPickItem>>> {
        let labels: Vec<String> = options
            .iter()
            .map(|o| match &o.description {
                Some(d) => format!("{} ({d})", o.label),
                None => o.label.clone(),
            })
            .collect();
        self.say(&format!(
            "{title} (comma-separated numbers, * for all)\n{}",
            numbered(labels.iter().map(String::as_str))
        ))
        .await?;
        let Some(answer) = self.ask("> ").await? else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        if answer == "*" {
            return Ok(Some(options.to_vec()));
        }
        let mut picked = Vec::new();
        for part in answer.split(',') {
            let Ok(n) = part.trim().parse::<usize>() else {
                continue;
            };
            if let Some(item) = n.checked_sub(1).and_then(|i| options.get(i)) {
                if !picked.contains(item) {
                    picked.push(item.clone());
                }
            }
        }
        Ok(Some(picked))
    }

    async fn open_file_for_read(&self) -> anyhow::Result<Option<PathBuf>> {
        let Some(answer) = self.ask("Path of group file to import: ").await? else {
            return Ok(None);
        };
        let answer = answer.trim();
        if answer.is_empty() {
            return Ok(None);
        }
        Ok(Some(PathBuf::from(answer)))
    }

    async fn save_text_to_new_file(&self, default_name: &str, content: &str) -> anyhow::Result<()> {
        let Some(answer) = self.ask(&format!("Save as [{default_name}]: ")).await? else {
            return Ok(());
        };
        let answer = answer.trim();
        let path = if answer.is_empty() {
            PathBuf::from(default_name)
        } else {
            PathBuf::from(answer)
        };
        tokio::fs::write(&path, content.as_bytes())
            .await
            .with_context(|| format!("failed to write {}", path.display()))?;
        self.say(&format!("Saved {}\n", path.display())).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prompt(input: &'static str) -> TerminalPrompt<&'static [u8], Vec<u8>> {
        TerminalPrompt::new(input.as_bytes(), Vec::new())
    }

    fn options() -> Vec<String> {
        vec!["Skip".into(), "Overwrite".into(), "Merge".into()]
    }

    #[tokio::test]
    async fn choice_by_number_or_name() {
        let p = prompt("3\n");
        assert_eq!(
            p.prompt_choice("Pick", &options()).await.unwrap().as_deref(),
            Some("Merge")
        );
        let p = prompt("overwrite\n");
        assert_eq!(
            p.prompt_choice("Pick", &options()).await.unwrap().as_deref(),
            Some("Overwrite")
        );
    }

    #[tokio::test]
    async fn choice_reasks_on_invalid_and_cancels_on_zero() {
        let p = prompt("9\nbogus\n0\n");
        assert_eq!(p.prompt_choice("Pick", &options()).await.unwrap(), None);
        let (_, out) = p.into_inner();
        let out = String::from_utf8(out).unwrap();
        assert_eq!(out.matches("Pick").count(), 3);
    }

    #[tokio::test]
    async fn eof_is_cancel() {
        let p = prompt("");
        assert_eq!(p.prompt_choice("Pick", &options()).await.unwrap(), None);
        assert_eq!(p.prompt_text("Name", None).await.unwrap(), None);
        assert_eq!(p.open_file_for_read().await.unwrap(), None);
    }

    #[tokio::test]
    async fn text_defaults_to_initial_value() {
        let p = prompt("\nRenamed\n");
        assert_eq!(
            p.prompt_text("Name", Some("Work")).await.unwrap().as_deref(),
            Some("Work")
        );
        assert_eq!(
            p.prompt_text("Name", Some("Work")).await.unwrap().as_deref(),
            Some("Renamed")
        );
    }

    #[tokio::test]
    async fn multi_select_parses_indices_and_star() {
        let items: Vec<QuickPickItem> =
            ["A", "B", "C"].into_iter().map(QuickPickItem::plain).collect();
        let p = prompt("3, 1, 3, 7\n*\n\n");
        let picked = p.prompt_multi_select("Groups", &items).await.unwrap().unwrap();
        assert_eq!(
            picked.iter().map(|i| i.key.as_str()).collect::<Vec<_>>(),
            vec!["C", "A"]
        );
        let all = p.prompt_multi_select("Groups", &items).await.unwrap().unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(p.prompt_multi_select("Groups", &items).await.unwrap(), None);
    }
}
