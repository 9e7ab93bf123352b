use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct Document {
    pub letter: Vec<Block>,
    pub bill: Vec<Block>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.letter.is_empty() && self.bill.is_empty()
    }

    /// Letter blocks followed by bill blocks, in source order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.letter.iter().chain(self.bill.iter())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Block {
    Heading {
        level: u8,
        text: String,
        #[serde(rename = "isActTitle")]
        is_act_title: bool,
    },
    #[serde(rename = "p")]
    Paragraph {
        text: String,
    },
    Image {
        alt: String,
        src: String,
    },
}

impl Block {
    pub fn heading(level: u8, text: impl Into<String>) -> Self {
        Block::Heading {
            level,
            text: text.into(),
            is_act_title: false,
        }
    }

    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph { text: text.into() }
    }

    pub fn image(alt: impl Into<String>, src: impl Into<String>) -> Self {
        Block::Image {
            alt: alt.into(),
            src: src.into(),
        }
    }

    pub fn text(&self) -> &str {
        match self {
            Block::Heading { text, .. } | Block::Paragraph { text } => text,
            Block::Image { alt, .. } => alt,
        }
    }
}
