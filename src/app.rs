use std::collections::HashMap;
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::config::Config;
use crate::db::Repository;
use crate::error::{AppError, Result};
use crate::models::{NewsletterSection, RegenerationStatus, SectionType, StoredNewsletter};
use crate::newsletter::{
    city_today, parse_sections, reconstruct, repair_legacy_markers, NewsletterGenerator,
    SectionRegenerator,
};
use crate::tui::AppAction;

// Message for a completed section rewrite
pub struct RegenerationResult {
    pub section_type: SectionType,
    pub result: std::result::Result<NewsletterSection, String>,
}

pub struct App {
    // Data
    pub draft: StoredNewsletter,
    document: String,
    pub sections: Vec<NewsletterSection>,
    /// Rewritten sections not yet written back, by type.
    pub pending: HashMap<SectionType, NewsletterSection>,

    // UI State
    pub selected_index: usize,
    pub show_help: bool,
    pub message: Option<String>,

    // Async state
    pub regeneration_status: RegenerationStatus,
    pending_section: Option<SectionType>,
    regen_rx: mpsc::Receiver<RegenerationResult>,
    regen_tx: mpsc::Sender<RegenerationResult>,

    // Services
    repository: Repository,
    regenerator: Option<SectionRegenerator>,
}

impl App {
    /// Opens the given draft, or the most recent one.
    pub async fn new(config: &Config, draft_id: Option<i64>) -> Result<Self> {
        let repository = Repository::new(&config.db_path).await?;

        let draft = match draft_id {
            Some(id) => repository
                .get_newsletter(id)
                .await?
                .ok_or(AppError::DraftNotFound(id))?,
            None => repository.latest_newsletter().await?.ok_or_else(|| {
                AppError::Config("no stored newsletters yet, run with --generate first".to_string())
            })?,
        };

        let regenerator = match NewsletterGenerator::from_config(config, repository.clone()) {
            Ok(generator) => Some(generator.section_regenerator()),
            Err(e) => {
                tracing::warn!("Section regeneration disabled: {}", e);
                None
            }
        };

        Ok(Self::with_parts(repository, draft, regenerator))
    }

    pub fn with_parts(
        repository: Repository,
        draft: StoredNewsletter,
        regenerator: Option<SectionRegenerator>,
    ) -> Self {
        let document = repair_legacy_markers(&draft.html_content);
        let sections = parse_sections(&document);
        let (regen_tx, regen_rx) = mpsc::channel(1);

        Self {
            draft,
            document,
            sections,
            pending: HashMap::new(),
            selected_index: 0,
            show_help: false,
            message: None,
            regeneration_status: if regenerator.is_some() {
                RegenerationStatus::Idle
            } else {
                RegenerationStatus::NoApiKey
            },
            pending_section: None,
            regen_rx,
            regen_tx,
            repository,
            regenerator,
        }
    }

    pub fn selected_section(&self) -> Option<&NewsletterSection> {
        self.sections.get(self.selected_index)
    }

    /// The selected section as it would be written: pending rewrite first.
    pub fn displayed_section(&self) -> Option<&NewsletterSection> {
        let section = self.selected_section()?;
        Some(self.pending.get(&section.section_type).unwrap_or(section))
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// The whole document with pending rewrites spliced in.
    pub fn current_html(&self) -> String {
        let edits: Vec<NewsletterSection> = self.pending.values().cloned().collect();
        reconstruct(&self.document, &edits)
    }

    pub async fn handle_action(&mut self, action: AppAction) -> Result<bool> {
        match action {
            AppAction::Quit => return Ok(true),

            AppAction::MoveUp => {
                if self.selected_index > 0 {
                    self.selected_index -= 1;
                }
            }

            AppAction::MoveDown => {
                let len = self.sections.len();
                if len > 0 && self.selected_index < len - 1 {
                    self.selected_index += 1;
                }
            }

            AppAction::RegenerateSection => {
                self.regenerate_selected();
            }

            AppAction::UndoSection => {
                if let Some(section) = self.selected_section() {
                    let (section_type, name) = (section.section_type, section.name.clone());
                    if self.pending.remove(&section_type).is_some() {
                        self.message = Some(format!("Reverted {name}"));
                    }
                }
            }

            AppAction::WriteDraft => {
                self.write_draft().await?;
            }

            AppAction::OpenPreview => {
                self.open_preview();
            }

            AppAction::ShowHelp => {
                self.show_help = true;
            }

            AppAction::HideHelp => {
                self.show_help = false;
            }
        }

        Ok(false)
    }

    fn regenerate_selected(&mut self) {
        let Some(regenerator) = self.regenerator.clone() else {
            self.regeneration_status = RegenerationStatus::NoApiKey;
            return;
        };
        if self.regeneration_status == RegenerationStatus::Generating {
            return;
        }
        let Some(section) = self.displayed_section().cloned() else {
            return;
        };
        if !section.editable {
            self.message = Some(format!("{} cannot be regenerated", section.name));
            return;
        }

        self.regeneration_status = RegenerationStatus::Generating;
        self.pending_section = Some(section.section_type);
        self.message = None;

        let tx = self.regen_tx.clone();
        tokio::spawn(async move {
            let section_type = section.section_type;
            let result = regenerator
                .regenerate(&section, city_today())
                .await
                .map_err(|e| e.to_string());
            let _ = tx.send(RegenerationResult { section_type, result }).await;
        });
    }

    /// Poll for completed section rewrites (non-blocking)
    pub fn poll_regeneration_result(&mut self) {
        if let Ok(result) = self.regen_rx.try_recv() {
            if self.pending_section == Some(result.section_type) {
                match result.result {
                    Ok(section) => {
                        self.message = Some(format!("{} rewritten, press w to save", section.name));
                        self.pending.insert(result.section_type, section);
                        self.regeneration_status = RegenerationStatus::Regenerated;
                    }
                    Err(e) => {
                        tracing::error!("Failed to regenerate section: {}", e);
                        self.message = Some(e);
                        self.regeneration_status = RegenerationStatus::Failed;
                    }
                }
                self.pending_section = None;
            }
        }
    }

    pub async fn write_draft(&mut self) -> Result<()> {
        if !self.is_dirty() {
            self.message = Some("Nothing to save".to_string());
            return Ok(());
        }

        let html = self.current_html();
        if !self.repository.update_newsletter_html(self.draft.id, html.clone()).await? {
            return Err(AppError::DraftNotFound(self.draft.id));
        }
        tracing::info!("Saved {} section edits to draft #{}", self.pending.len(), self.draft.id);

        self.draft.html_content = html.clone();
        self.document = html;
        self.sections = parse_sections(&self.document);
        self.pending.clear();
        self.selected_index = self.selected_index.min(self.sections.len().saturating_sub(1));
        self.message = Some(format!("Saved draft #{}", self.draft.id));
        Ok(())
    }

    fn preview_path(&self) -> PathBuf {
        std::env::temp_dir().join(format!("slw-newsletter-{}.html", self.draft.id))
    }

    fn open_preview(&mut self) {
        let path = self.preview_path();
        let outcome = std::fs::write(&path, self.current_html())
            .map_err(AppError::from)
            .and_then(|()| open::that(&path).map_err(AppError::from));
        self.message = Some(match outcome {
            Ok(()) => format!("Opened {}", path.display()),
            Err(e) => {
                tracing::error!("Failed to open preview: {}", e);
                format!("Preview failed: {e}")
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsletterDraft;

    fn block(id: &str, text: &str) -> String {
        format!(
            "<!-- SECTION_START:{id} -->\n<tr><td style=\"padding: 24px;\"><p>{text}</p></td></tr>\n<!-- SECTION_END:{id} -->\n"
        )
    }

    async fn app_with_draft() -> App {
        let repository = Repository::in_memory().await.unwrap();
        let html = [
            block("weather", "Sunny all week with cool mornings around nine degrees."),
            block("tip", "Carry cash at the Sunday tianguis, most stalls do not take cards."),
            block("footer", "¡Hasta la próxima! Thanks for reading San Luis Way Weekly."),
        ]
        .concat();
        let id = repository
            .save_newsletter(NewsletterDraft {
                subject: "San Luis Way Weekly: test".to_string(),
                html_content: html,
                date_range: "October 19 - October 26, 2026".to_string(),
            })
            .await
            .unwrap();
        let draft = repository.get_newsletter(id).await.unwrap().unwrap();
        App::with_parts(repository, draft, None)
    }

    fn rewritten_tip() -> NewsletterSection {
        NewsletterSection {
            id: "tip".to_string(),
            name: "Expat Tip".to_string(),
            section_type: SectionType::Tip,
            html: block("tip", "Get your RFC at the SAT office on Avenida Himno Nacional.")
                .trim_end()
                .to_string(),
            editable: true,
            end_found: true,
        }
    }

    #[tokio::test]
    async fn loads_sections_and_clamps_navigation() {
        let mut app = app_with_draft().await;
        assert_eq!(app.sections.len(), 3);
        assert_eq!(app.regeneration_status, RegenerationStatus::NoApiKey);

        app.handle_action(AppAction::MoveUp).await.unwrap();
        assert_eq!(app.selected_index, 0);
        for _ in 0..5 {
            app.handle_action(AppAction::MoveDown).await.unwrap();
        }
        assert_eq!(app.selected_index, 2);
        assert!(app.handle_action(AppAction::Quit).await.unwrap());
    }

    #[tokio::test]
    async fn regenerate_without_key_reports_status() {
        let mut app = app_with_draft().await;
        app.handle_action(AppAction::RegenerateSection).await.unwrap();
        assert_eq!(app.regeneration_status, RegenerationStatus::NoApiKey);
        assert!(!app.is_dirty());
    }

    #[tokio::test]
    async fn polled_result_becomes_pending_edit() {
        let mut app = app_with_draft().await;
        app.selected_index = 1;
        app.pending_section = Some(SectionType::Tip);
        app.regen_tx
            .send(RegenerationResult {
                section_type: SectionType::Tip,
                result: Ok(rewritten_tip()),
            })
            .await
            .unwrap();

        app.poll_regeneration_result();

        assert!(app.is_dirty());
        assert_eq!(app.regeneration_status, RegenerationStatus::Regenerated);
        assert!(app.displayed_section().unwrap().html.contains("RFC"));

        app.handle_action(AppAction::UndoSection).await.unwrap();
        assert!(!app.is_dirty());
        assert!(app.displayed_section().unwrap().html.contains("tianguis"));
    }

    #[tokio::test]
    async fn stale_results_are_ignored() {
        let mut app = app_with_draft().await;
        app.pending_section = Some(SectionType::Weather);
        app.regen_tx
            .send(RegenerationResult {
                section_type: SectionType::Tip,
                result: Err("boom".to_string()),
            })
            .await
            .unwrap();

        app.poll_regeneration_result();
        assert_eq!(app.pending_section, Some(SectionType::Weather));
        assert!(app.message.is_none());
    }

    #[tokio::test]
    async fn write_persists_pending_edits() {
        let mut app = app_with_draft().await;
        app.pending.insert(SectionType::Tip, rewritten_tip());

        app.handle_action(AppAction::WriteDraft).await.unwrap();

        assert!(!app.is_dirty());
        let stored = app
            .repository
            .get_newsletter(app.draft.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.html_content.contains("Avenida Himno Nacional"));
        assert!(!stored.html_content.contains("tianguis"));
        assert!(stored.html_content.contains("Sunny all week"));
        assert_eq!(app.sections.len(), 3);
    }

    #[tokio::test]
    async fn write_without_edits_is_a_no_op() {
        let mut app = app_with_draft().await;
        let before = app.draft.html_content.clone();
        app.write_draft().await.unwrap();
        assert_eq!(app.message.as_deref(), Some("Nothing to save"));
        assert_eq!(app.current_html(), before);
    }
}
