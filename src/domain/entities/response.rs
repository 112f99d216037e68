use serde::Serialize;

/// How a [`Response`] is delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Plain message in the originating channel
    Message,
    /// Message in the originating channel addressed to the author
    Reply,
    /// Embed in the originating channel
    Embed,
    /// Direct message to the author
    Dm,
    #[default]
    None,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

/// Structured rich reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    pub title: Option<String>,
    pub description: Option<String>,
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    pub footer: Option<String>,
}

impl Embed {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_color(mut self, color: u32) -> Self {
        self.color = Some(color);
        self
    }

    pub fn with_footer(mut self, footer: impl Into<String>) -> Self {
        self.footer = Some(footer.into());
        self
    }

    pub fn add_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(EmbedField {
            name: name.into(),
            value: value.into(),
            inline: false,
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&EmbedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// Reply descriptor filled in by handlers and resolved by the transport
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: ResponseType,
    pub content: Option<String>,
    pub embed: Option<Embed>,
}

impl Response {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(content: impl Into<String>) -> Self {
        Self { kind: ResponseType::Message, content: Some(content.into()), embed: None }
    }

    pub fn reply(content: impl Into<String>) -> Self {
        Self { kind: ResponseType::Reply, content: Some(content.into()), embed: None }
    }

    pub fn embed(embed: Embed) -> Self {
        Self { kind: ResponseType::Embed, content: None, embed: Some(embed) }
    }

    pub fn dm(content: impl Into<String>) -> Self {
        Self { kind: ResponseType::Dm, content: Some(content.into()), embed: None }
    }

    pub fn with_embed(mut self, embed: Embed) -> Self {
        self.embed = Some(embed);
        self
    }

    pub fn is_none(&self) -> bool {
        self.kind == ResponseType::None
    }
}
