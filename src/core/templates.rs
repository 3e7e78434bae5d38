//! Starting points for new papers

use super::session::Paper;

/// A named paper skeleton
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperTemplate {
    pub name: &'static str,
    pub description: &'static str,
    pub body: &'static str,
}

impl PaperTemplate {
    /// Create a paper from this template
    pub fn instantiate(&self, title: &str) -> Paper {
        let title = if title.trim().is_empty() {
            "Untitled Paper"
        } else {
            title.trim()
        };
        Paper::new(title, self.body.replace("{{title}}", title))
    }
}

pub const BLANK: PaperTemplate = PaperTemplate {
    name: "Blank",
    description: "An empty document",
    body: "# {{title}}\n\n",
};

pub const RESEARCH_ARTICLE: PaperTemplate = PaperTemplate {
    name: "Research Article",
    description: "IMRaD structure with abstract and references",
    body: "# {{title}}\n\n\
## Abstract\n\n\
## Introduction\n\n\
## Methods\n\n\
## Results\n\n\
## Discussion\n\n\
## References\n\n",
};

pub const REVIEW: PaperTemplate = PaperTemplate {
    name: "Literature Review",
    description: "Survey of prior work grouped by theme",
    body: "# {{title}}\n\n\
## Abstract\n\n\
## Scope and Search Strategy\n\n\
## Themes\n\n\
## Open Problems\n\n\
## Conclusion\n\n\
## References\n\n",
};

pub const THESIS_CHAPTER: PaperTemplate = PaperTemplate {
    name: "Thesis Chapter",
    description: "Chapter with background, contribution and summary",
    body: "# {{title}}\n\n\
## Background\n\n\
## Contribution\n\n\
$$\n\n$$\n\n\
## Evaluation\n\n\
## Summary\n\n",
};

/// Templates offered on the templates page, blank first
pub const TEMPLATES: [PaperTemplate; 4] = [BLANK, RESEARCH_ARTICLE, REVIEW, THESIS_CHAPTER];
