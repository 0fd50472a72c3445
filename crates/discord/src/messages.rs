use serde::Serialize;

/// Embed accent colors for backend outcome rendering.
pub mod colors {
    pub const SUCCESS: u32 = 0x57F287;
    pub const WARNING: u32 = 0xFEE75C;
    pub const FAILURE: u32 = 0xED4245;
    pub const NEUTRAL: u32 = 0x95A5A6;
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmbedField {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Embed {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    pub fields: Vec<EmbedField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonStyle {
    Primary,
    Secondary,
    Danger,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Button {
    pub custom_id: String,
    pub label: String,
    pub style: ButtonStyle,
}

impl Button {
    pub fn new(custom_id: impl Into<String>, label: impl Into<String>) -> Self {
        Self { custom_id: custom_id.into(), label: label.into(), style: ButtonStyle::Secondary }
    }

    pub fn style(mut self, style: ButtonStyle) -> Self {
        self.style = style;
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectOption {
    pub value: String,
    pub label: String,
}

impl SelectOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self { value: value.into(), label: label.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct SelectMenu {
    pub custom_id: String,
    pub placeholder: String,
    pub options: Vec<SelectOption>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Component {
    Buttons { elements: Vec<Button> },
    Select { menu: SelectMenu },
}

/// Free-text input inside a modal. Bounds are the widget's own constraint;
/// nothing downstream re-validates the value.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TextInput {
    pub custom_id: String,
    pub label: String,
    pub min_length: u16,
    pub max_length: u16,
    pub required: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ModalTemplate {
    pub custom_id: String,
    pub title: String,
    pub inputs: Vec<TextInput>,
}

/// A downloadable attachment emitted instead of (or alongside) inline text.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct FilePayload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MessageTemplate {
    pub fallback_text: String,
    pub embeds: Vec<Embed>,
    pub components: Vec<Component>,
    pub attachments: Vec<FilePayload>,
}

pub struct MessageBuilder {
    fallback_text: String,
    embeds: Vec<Embed>,
    components: Vec<Component>,
    attachments: Vec<FilePayload>,
}

impl MessageBuilder {
    pub fn new(fallback_text: impl Into<String>) -> Self {
        Self {
            fallback_text: fallback_text.into(),
            embeds: Vec::new(),
            components: Vec::new(),
            attachments: Vec::new(),
        }
    }

    pub fn embed<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut EmbedBuilder),
    {
        let mut builder = EmbedBuilder::default();
        build(&mut builder);
        self.embeds.push(builder.build());
        self
    }

    pub fn buttons<F>(mut self, build: F) -> Self
    where
        F: FnOnce(&mut ButtonsBuilder),
    {
        let mut builder = ButtonsBuilder::default();
        build(&mut builder);
        self.components.push(Component::Buttons { elements: builder.build() });
        self
    }

    pub fn select(mut self, menu: SelectMenu) -> Self {
        self.components.push(Component::Select { menu });
        self
    }

    pub fn attach(mut self, file: FilePayload) -> Self {
        self.attachments.push(file);
        self
    }

    pub fn build(self) -> MessageTemplate {
        MessageTemplate {
            fallback_text: self.fallback_text,
            embeds: self.embeds,
            components: self.components,
            attachments: self.attachments,
        }
    }
}

#[derive(Default)]
pub struct EmbedBuilder {
    title: Option<String>,
    description: Option<String>,
    color: Option<u32>,
    fields: Vec<EmbedField>,
    footer: Option<String>,
}

impl EmbedBuilder {
    pub fn title(&mut self, title: impl Into<String>) -> &mut Self {
        self.title = Some(title.into());
        self
    }

    pub fn description(&mut self, description: impl Into<String>) -> &mut Self {
        self.description = Some(description.into());
        self
    }

    pub fn color(&mut self, color: u32) -> &mut Self {
        self.color = Some(color);
        self
    }

    pub fn field(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push(EmbedField { name: name.into(), value: value.into(), inline: true });
        self
    }

    pub fn wide_field(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.fields.push(EmbedField { name: name.into(), value: value.into(), inline: false });
        self
    }

    pub fn footer(&mut self, footer: impl Into<String>) -> &mut Self {
        self.footer = Some(footer.into());
        self
    }

    fn build(self) -> Embed {
        Embed {
            title: self.title,
            description: self.description,
            color: self.color,
            fields: self.fields,
            footer: self.footer,
        }
    }
}

#[derive(Default)]
pub struct ButtonsBuilder {
    elements: Vec<Button>,
}

impl ButtonsBuilder {
    pub fn button(&mut self, button: Button) -> &mut Self {
        self.elements.push(button);
        self
    }

    fn build(self) -> Vec<Button> {
        self.elements
    }
}

#[cfg(test)]
mod tests {
    use super::{
        colors, Button, ButtonStyle, Component, MessageBuilder, SelectMenu, SelectOption,
    };

    #[test]
    fn message_builder_creates_typed_structure() {
        let message = MessageBuilder::new("fallback")
            .embed(|embed| {
                embed.title("Zone 5 kill points").color(colors::SUCCESS).field("KP", "1,234");
            })
            .buttons(|buttons| {
                buttons.button(Button::new("register.submit.v1", "Submit").style(ButtonStyle::Primary));
            })
            .build();

        assert_eq!(message.embeds.len(), 1);
        assert_eq!(message.embeds[0].color, Some(colors::SUCCESS));
        assert_eq!(message.embeds[0].fields.len(), 1);
        assert!(matches!(
            &message.components[0],
            Component::Buttons { elements } if elements.len() == 1
                && elements[0].style == ButtonStyle::Primary
        ));
    }

    #[test]
    fn select_menus_keep_option_order() {
        let message = MessageBuilder::new("pick one")
            .select(SelectMenu {
                custom_id: "register.kind.v1".to_owned(),
                placeholder: "Account type".to_owned(),
                options: vec![
                    SelectOption::new("main", "Main account"),
                    SelectOption::new("farm", "Farm account"),
                ],
            })
            .build();

        let Component::Select { menu } = &message.components[0] else {
            panic!("expected select component");
        };
        assert_eq!(menu.options[0].value, "main");
        assert_eq!(menu.options[1].value, "farm");
    }

    #[test]
    fn buttons_default_to_secondary_style() {
        let button = Button::new("register.cancel.v1", "Cancel");
        assert_eq!(button.style, ButtonStyle::Secondary);
    }
}
