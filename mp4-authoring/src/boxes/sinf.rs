use super::{FourCc, SchmBox, TencBox};
use crate::{Error, Reader, Result, parser};
use bytes::Bytes;

/// Original Format Box (frma) - sample entry type before protection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrmaBox {
    pub data_format: FourCc,
}

/// Scheme Information Box (schi).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchiBox {
    pub tenc: Option<TencBox>,
}

/// Protection Scheme Information Box (sinf).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SinfBox {
    pub frma: FrmaBox,
    pub schm: Option<SchmBox>,
    pub schi: Option<SchiBox>,
}

impl SinfBox {
    pub fn new(original_format: FourCc, schm: SchmBox, tenc: TencBox) -> Self {
        Self {
            frma: FrmaBox {
                data_format: original_format,
            },
            schm: Some(schm),
            schi: Some(SchiBox { tenc: Some(tenc) }),
        }
    }

    pub fn tenc(&self) -> Option<&TencBox> {
        self.schi.as_ref().and_then(|x| x.tenc.as_ref())
    }

    pub fn parse(payload: Bytes) -> Result<Self> {
        let mut frma = None;
        let mut schm = None;
        let mut schi = None;

        for (box_type, payload) in parser::child_boxes(&mut Reader::new(payload))? {
            match box_type {
                FourCc::FRMA => {
                    let data_format = Reader::new(payload)
                        .read_u32()
                        .map_err(|_| Error::parse("frma box data format (u32)"))?;
                    frma = Some(FrmaBox {
                        data_format: data_format.into(),
                    });
                }
                FourCc::SCHM => schm = Some(SchmBox::parse(payload)?),
                FourCc::SCHI => {
                    let mut tenc = None;
                    for (box_type, payload) in parser::child_boxes(&mut Reader::new(payload))? {
                        if box_type == FourCc::TENC {
                            tenc = Some(TencBox::parse(payload)?);
                        }
                    }
                    schi = Some(SchiBox { tenc });
                }
                _ => (),
            }
        }

        Ok(Self {
            frma: frma.ok_or_else(|| Error::parse("sinf box without frma box"))?,
            schm,
            schi,
        })
    }
}
