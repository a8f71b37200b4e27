//! `playerslist` XML rating lists (2020 onward).
//!
//! ```xml
//! <playerslist>
//!   <player>
//!     <fideid>1503014</fideid>
//!     <name>Carlsen, Magnus</name>
//!     <country>NOR</country>
//!     <sex>M</sex>
//!     <title>GM</title>
//!     <rating>2839</rating>
//!     <games>5</games>
//!     <birthday>1990</birthday>
//!     <flag></flag>
//!   </player>
//! </playerslist>
//! ```
//!
//! Read as a stream of events so a full list (several hundred thousand
//! players) never has to be held as a tree.

use fide_core::record::RatingRecord;
use quick_xml::{
  Reader,
  events::{BytesText, Event},
};

use crate::{ParsedList, error::Error, fields};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
  FideId,
  Name,
  Title,
  Country,
  Sex,
  Rating,
  Games,
  Birthday,
  Flag,
}

impl Field {
  fn from_local(local: &[u8]) -> Option<Self> {
    Some(match local {
      b"fideid" | b"fide_id" => Self::FideId,
      b"name" => Self::Name,
      b"title" => Self::Title,
      b"country" => Self::Country,
      b"sex" => Self::Sex,
      b"rating" => Self::Rating,
      b"games" => Self::Games,
      b"birthday" => Self::Birthday,
      b"flag" => Self::Flag,
      _ => return None,
    })
  }
}

/// Raw child values of one `<player>` element.
#[derive(Debug, Default)]
struct PlayerFields {
  fide_id:  Option<String>,
  name:     Option<String>,
  title:    Option<String>,
  country:  Option<String>,
  sex:      Option<String>,
  rating:   Option<String>,
  games:    Option<String>,
  birthday: Option<String>,
  flag:     Option<String>,
}

impl PlayerFields {
  fn set(&mut self, field: Field, value: String) {
    let slot = match field {
      Field::FideId => &mut self.fide_id,
      Field::Name => &mut self.name,
      Field::Title => &mut self.title,
      Field::Country => &mut self.country,
      Field::Sex => &mut self.sex,
      Field::Rating => &mut self.rating,
      Field::Games => &mut self.games,
      Field::Birthday => &mut self.birthday,
      Field::Flag => &mut self.flag,
    };
    *slot = Some(value);
  }

  /// `Err` carries a description of why the element was dropped.
  fn into_record(self) -> Result<RatingRecord, String> {
    let raw_id = self.fide_id.unwrap_or_default();
    let Some(fide_id) = fields::fide_id(&raw_id) else {
      return Err(format!("player without a valid id ({raw_id:?})"));
    };

    let opt = |v: &Option<String>| v.as_deref().and_then(fields::text);
    let num = |v: &Option<String>| v.as_deref().and_then(fields::int);

    Ok(RatingRecord {
      fide_id,
      name: opt(&self.name),
      title: opt(&self.title),
      federation: opt(&self.country),
      sex: opt(&self.sex),
      birth_year: self.birthday.as_deref().and_then(fields::year),
      flag: opt(&self.flag),
      rating: num(&self.rating),
      games: num(&self.games),
    })
  }
}

fn local_name(name: &[u8]) -> &[u8] {
  match name.iter().rposition(|&b| b == b':') {
    Some(pos) => &name[pos + 1..],
    None => name,
  }
}

fn decode_text(text: &BytesText<'_>) -> String {
  match text.unescape() {
    Ok(s) => s.into_owned(),
    Err(_) => String::from_utf8_lossy(text.as_ref()).into_owned(),
  }
}

/// Parse a whole `playerslist` document.
///
/// A `<player>` without a usable id, or one left unclosed at end of input,
/// is counted as malformed. A document that is not well-formed XML is an
/// error.
pub fn parse_xml(input: &[u8]) -> Result<ParsedList, Error> {
  let mut reader = Reader::from_reader(input);
  reader.config_mut().trim_text(true);

  let mut list = ParsedList::default();
  let mut player: Option<PlayerFields> = None;
  let mut field: Option<Field> = None;
  let mut text = String::new();
  let mut index = 0usize;
  let mut buf = Vec::new();

  loop {
    match reader.read_event_into(&mut buf) {
      Ok(Event::Start(ref e)) => {
        let name = e.name();
        let local = local_name(name.as_ref());
        if local == b"player" {
          if player.is_some() {
            list.push_malformed(format!("player #{index}: nested <player>"));
          }
          index += 1;
          player = Some(PlayerFields::default());
          field = None;
        } else if player.is_some() {
          field = Field::from_local(local);
          text.clear();
        }
      }
      Ok(Event::Empty(ref e)) => {
        let name = e.name();
        let local = local_name(name.as_ref());
        if local == b"player" {
          index += 1;
          list.push_malformed(format!("player #{index}: empty <player/>"));
        } else if let (Some(p), Some(f)) = (player.as_mut(), Field::from_local(local)) {
          p.set(f, String::new());
        }
      }
      Ok(Event::Text(ref e)) => {
        if field.is_some() {
          text.push_str(&decode_text(e));
        }
      }
      Ok(Event::CData(ref e)) => {
        if field.is_some() {
          text.push_str(&String::from_utf8_lossy(e.as_ref()));
        }
      }
      Ok(Event::End(ref e)) => {
        let name = e.name();
        let local = local_name(name.as_ref());
        if local == b"player" {
          if let Some(p) = player.take() {
            match p.into_record() {
              Ok(record) => list.records.push(record),
              Err(why) => list.push_malformed(format!("player #{index}: {why}")),
            }
          }
          field = None;
        } else if let (Some(p), Some(f)) = (player.as_mut(), field.take()) {
          p.set(f, std::mem::take(&mut text));
        }
      }
      Ok(Event::Eof) => break,
      Err(e) => {
        return Err(Error::Xml {
          position: reader.error_position() as u64,
          message:  e.to_string(),
        });
      }
      _ => {}
    }
    buf.clear();
  }

  if player.is_some() {
    list.push_malformed(format!("player #{index}: unclosed at end of input"));
  }

  Ok(list)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(players: &str) -> String {
    format!("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<playerslist>{players}</playerslist>")
  }

  const CARLSEN: &str = "<player><fideid>1503014</fideid><name>Carlsen, Magnus</name>\
    <country>NOR</country><sex>M</sex><title>GM</title><w_title></w_title>\
    <o_title></o_title><foa_title></foa_title><rating>2887</rating>\
    <games>10</games><k>20</k><birthday>1990</birthday><flag></flag></player>";

  #[test]
  fn full_element_is_decoded() {
    let list = parse_xml(doc(CARLSEN).as_bytes()).unwrap();
    assert_eq!(list.malformed, 0);
    let r = &list.records[0];
    assert_eq!(r.fide_id, 1503014);
    assert_eq!(r.name.as_deref(), Some("Carlsen, Magnus"));
    assert_eq!(r.federation.as_deref(), Some("NOR"));
    assert_eq!(r.sex.as_deref(), Some("M"));
    assert_eq!(r.title.as_deref(), Some("GM"));
    assert_eq!(r.rating, Some(2887));
    assert_eq!(r.games, Some(10));
    assert_eq!(r.birth_year, Some(1990));
    assert_eq!(r.flag, None);
  }

  #[test]
  fn alternate_id_tag_is_accepted() {
    let list =
      parse_xml(doc("<player><fide_id>42</fide_id><rating>1500</rating></player>").as_bytes())
        .unwrap();
    assert_eq!(list.records[0].fide_id, 42);
    assert_eq!(list.records[0].rating, Some(1500));
  }

  #[test]
  fn element_without_id_is_dropped() {
    let input = doc(&format!("<player><name>Ghost</name><rating>1800</rating></player>{CARLSEN}"));
    let list = parse_xml(input.as_bytes()).unwrap();
    assert_eq!(list.records.len(), 1);
    assert_eq!(list.malformed, 1);
    assert!(list.samples[0].contains("player #1"));
  }

  #[test]
  fn element_without_rating_is_kept_for_its_profile() {
    let list =
      parse_xml(doc("<player><fideid>7</fideid><name>New, Player</name><rating/></player>").as_bytes())
        .unwrap();
    assert_eq!(list.records.len(), 1);
    assert_eq!(list.records[0].rating, None);
    assert_eq!(list.records[0].name.as_deref(), Some("New, Player"));
  }

  #[test]
  fn entities_are_unescaped() {
    let list = parse_xml(
      doc("<player><fideid>9</fideid><name>O&apos;Brien &amp; Co</name></player>").as_bytes(),
    )
    .unwrap();
    assert_eq!(list.records[0].name.as_deref(), Some("O'Brien & Co"));
  }

  #[test]
  fn non_numeric_values_become_none() {
    let list = parse_xml(
      doc("<player><fideid>9</fideid><rating>abc</rating><games></games><birthday>0</birthday></player>")
        .as_bytes(),
    )
    .unwrap();
    let r = &list.records[0];
    assert_eq!(r.rating, None);
    assert_eq!(r.games, None);
    assert_eq!(r.birth_year, None);
  }

  #[test]
  fn truncated_player_is_malformed() {
    let input = format!("<playerslist>{CARLSEN}<player><fideid>5</fideid>");
    let list = parse_xml(input.as_bytes()).unwrap();
    assert_eq!(list.records.len(), 1);
    assert_eq!(list.malformed, 1);
  }

  #[test]
  fn mismatched_tags_are_a_document_error() {
    let err = parse_xml(b"<playerslist><player></playerslist>").unwrap_err();
    assert!(matches!(err, Error::Xml { .. }));
  }

  #[test]
  fn empty_playerslist() {
    let list = parse_xml(doc("").as_bytes()).unwrap();
    assert!(list.records.is_empty());
    assert_eq!(list.malformed, 0);
  }
}
