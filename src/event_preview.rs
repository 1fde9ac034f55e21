//! Functions for generating text previews of timeline events.
//!
//! These text previews are used for the preview of each room's latest message
//! in the room list summaries.

use crate::timeline::item::{
    MembershipChange, MessageContent, MessageKind, RoomMembershipChange, StateEventKind,
    TimelineItemContent,
};

/// What should be displayed before the text preview of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeforeText {
    /// Nothing should be displayed before the text preview.
    Nothing,
    /// The sender's username with a colon should be displayed before the text preview.
    UsernameWithColon,
    /// The sender's username (without a colon) should be displayed before the text preview.
    UsernameWithoutColon,
}

/// A text preview of a timeline event, plus how a username should be displayed before it.
///
/// Call [`TextPreview::format_with()`] to generate displayable text
/// with the appropriately-formatted preceding username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPreview {
    text: String,
    before_text: BeforeText,
}
impl From<(String, BeforeText)> for TextPreview {
    fn from((text, before_text): (String, BeforeText)) -> Self {
        Self { text, before_text }
    }
}
impl TextPreview {
    /// Formats the text preview with the appropriate preceding username.
    ///
    /// In a direct (1:1) room the `UsernameWithColon` prefix is omitted,
    /// since there is only one possible sender on the other side.
    pub fn format_with(self, username: &str, is_direct: bool) -> String {
        let Self { text, before_text } = self;
        match before_text {
            BeforeText::Nothing => text,
            BeforeText::UsernameWithColon if is_direct => text,
            BeforeText::UsernameWithColon => format!("{username}: {text}"),
            BeforeText::UsernameWithoutColon => format!("{username} {text}"),
        }
    }
}

/// Returns a plaintext preview of the given timeline event content.
pub fn text_preview_of_timeline_item(
    content: &TimelineItemContent,
    sender_username: &str,
) -> TextPreview {
    match content {
        TimelineItemContent::Message(m) => text_preview_of_message(m, sender_username),
        TimelineItemContent::RedactedMessage => TextPreview::from((
            String::from("[Message was deleted]"),
            BeforeText::UsernameWithColon,
        )),
        TimelineItemContent::Sticker { body } => TextPreview::from((
            format!("[Sticker]: {body}"),
            BeforeText::UsernameWithColon,
        )),
        TimelineItemContent::UnableToDecrypt => TextPreview::from((
            String::from("[Unable to decrypt message]"),
            BeforeText::UsernameWithColon,
        )),
        TimelineItemContent::Poll { question } => TextPreview::from((
            format!("[Poll]: {question}"),
            BeforeText::UsernameWithColon,
        )),
        TimelineItemContent::CallInvite => TextPreview::from((
            String::from("[Call Invitation]"),
            BeforeText::UsernameWithColon,
        )),
        TimelineItemContent::MembershipChange(membership_change) => {
            text_preview_of_room_membership_change(membership_change)
        }
        TimelineItemContent::ProfileChange { new_display_name, .. } => TextPreview::from((
            match new_display_name {
                Some(name) => format!("changed their display name to \"{name}\""),
                None => String::from("removed their display name"),
            },
            BeforeText::UsernameWithoutColon,
        )),
        TimelineItemContent::OtherState { kind, .. } => text_preview_of_other_state(kind),
    }
}

/// Returns a text preview of the given message.
pub fn text_preview_of_message(
    message: &MessageContent,
    sender_username: &str,
) -> TextPreview {
    let body = &message.body;
    let text = match message.msgtype {
        MessageKind::Audio => format!("[Audio]: {body}"),
        MessageKind::Emote => return TextPreview::from((
            format!("* {sender_username} {body}"),
            BeforeText::Nothing,
        )),
        MessageKind::File => format!("[File]: {body}"),
        MessageKind::Image => format!("[Image]: {body}"),
        MessageKind::Location => format!("[Location]: {body}"),
        MessageKind::Notice => format!("[Notice]: {body}"),
        MessageKind::Text => body.clone(),
        MessageKind::Video => format!("[Video]: {body}"),
    };
    TextPreview::from((text, BeforeText::UsernameWithColon))
}

/// Returns a text preview of the given room membership change.
pub fn text_preview_of_room_membership_change(
    change: &RoomMembershipChange,
) -> TextPreview {
    let target = change.display_name.as_deref().unwrap_or(change.user_id.as_str());
    let text = match change.change {
        MembershipChange::Joined => String::from("joined this room."),
        MembershipChange::Left => String::from("left this room."),
        MembershipChange::Invited => format!("invited {target} to this room."),
        MembershipChange::InvitationAccepted => String::from("accepted an invitation to this room."),
        MembershipChange::InvitationRejected => String::from("rejected an invitation to this room."),
        MembershipChange::InvitationRevoked => format!("revoked {target}'s invitation to this room."),
        MembershipChange::Kicked => format!("kicked {target} from this room."),
        MembershipChange::Banned => format!("banned {target} from this room."),
        MembershipChange::Unbanned => format!("unbanned {target} from this room."),
        MembershipChange::KickedAndBanned => format!("kicked and banned {target} from this room."),
        MembershipChange::Knocked => String::from("is requesting to join this room."),
    };
    TextPreview::from((text, BeforeText::UsernameWithoutColon))
}

/// Returns a text preview of a state event that isn't a membership or profile change.
pub fn text_preview_of_other_state(kind: &StateEventKind) -> TextPreview {
    let text = match kind {
        StateEventKind::RoomAvatar => String::from("changed this room's avatar image."),
        StateEventKind::RoomCreate => String::from("created this room."),
        StateEventKind::RoomEncryption => String::from("enabled encryption in this room."),
        StateEventKind::RoomName => String::from("changed this room's name."),
        StateEventKind::RoomTopic => String::from("changed this room's topic."),
        StateEventKind::RoomTombstone => String::from("closed this room."),
        other => format!("sent a {} state event.", other.event_type()),
    };
    TextPreview::from((text, BeforeText::UsernameWithoutColon))
}
