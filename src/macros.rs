// SPDX-FileCopyrightText: 2023 Joshua Goins <josh@redstrate.com>
// SPDX-License-Identifier: GPL-3.0-or-later

/// Creates the closed set of sections a container understands. For example, `Position(PositionSection) = b"POSI"` becomes
/// `SectionKind::Position`, `Section::Position(PositionSection)` and `Section::as_position()`.
///
/// Sections listed under `decode_only` can be read, but writing them fails with [`crate::error::Error::EncodeNotImplemented`].
macro_rules! define_sections {
    (
        encodable {
            $($variant:ident($ty:ty) = $tag:literal),+ $(,)?
        }
        decode_only {
            $($ro_variant:ident($ro_ty:ty) = $ro_tag:literal),+ $(,)?
        }
    ) => {
        /// Every kind of section known to this container.
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum SectionKind {
            $($variant,)+
            $($ro_variant,)+
        }

        impl SectionKind {
            pub const ALL: &'static [SectionKind] = &[
                $(SectionKind::$variant,)+
                $(SectionKind::$ro_variant,)+
            ];

            pub fn tag(self) -> $crate::section::SectionTag {
                match self {
                    $(SectionKind::$variant => $crate::section::SectionTag(*$tag),)+
                    $(SectionKind::$ro_variant => $crate::section::SectionTag(*$ro_tag),)+
                }
            }

            pub fn from_tag(tag: $crate::section::SectionTag) -> Option<Self> {
                match &tag.0 {
                    $($tag => Some(SectionKind::$variant),)+
                    $($ro_tag => Some(SectionKind::$ro_variant),)+
                    _ => None,
                }
            }

            /// Whether sections of this kind can be written.
            pub fn supports_encode(self) -> bool {
                match self {
                    $(SectionKind::$variant => true,)+
                    $(SectionKind::$ro_variant => false,)+
                }
            }
        }

        /// One decoded section.
        #[derive(Clone, Debug, PartialEq)]
        pub enum Section {
            $($variant($ty),)+
            $($ro_variant($ro_ty),)+
        }

        impl Section {
            pub fn kind(&self) -> SectionKind {
                match self {
                    $(Section::$variant(_) => SectionKind::$variant,)+
                    $(Section::$ro_variant(_) => SectionKind::$ro_variant,)+
                }
            }

            /// Number of records, as stored in the container header.
            pub fn count(&self) -> u32 {
                use $crate::section::DecodeSection;
                match self {
                    $(Section::$variant(section) => section.count(),)+
                    $(Section::$ro_variant(section) => section.count(),)+
                }
            }

            pub(crate) fn decode(
                kind: SectionKind,
                reader: &mut $crate::cursor::ByteReader,
                count: u32,
            ) -> $crate::error::Result<Self> {
                use $crate::section::DecodeSection;
                match kind {
                    $(SectionKind::$variant => <$ty>::decode(reader, count).map(Section::$variant),)+
                    $(SectionKind::$ro_variant => <$ro_ty>::decode(reader, count).map(Section::$ro_variant),)+
                }
            }

            pub(crate) fn resolve_names(
                &mut self,
                strings: &$crate::string_heap::StringTable,
            ) -> $crate::error::Result<()> {
                use $crate::section::DecodeSection;
                match self {
                    $(Section::$variant(section) => section.resolve_names(strings),)+
                    $(Section::$ro_variant(section) => section.resolve_names(strings),)+
                }
            }

            pub(crate) fn encode(
                &self,
                writer: &mut $crate::offset_table::OffsetWriter,
                context: &mut $crate::section::EncodeContext,
            ) -> $crate::error::Result<()> {
                use $crate::section::EncodeSection;
                match self {
                    $(Section::$variant(section) => section.encode(writer, context),)+
                    $(Section::$ro_variant(_) => Err($crate::error::Error::EncodeNotImplemented {
                        tag: self.kind().tag(),
                    }),)+
                }
            }
        }

        paste::paste! {
            impl Section {
                $(
                    pub fn [<as_ $variant:snake>](&self) -> Option<&$ty> {
                        match self {
                            Section::$variant(section) => Some(section),
                            _ => None,
                        }
                    }
                )+
                $(
                    pub fn [<as_ $ro_variant:snake>](&self) -> Option<&$ro_ty> {
                        match self {
                            Section::$ro_variant(section) => Some(section),
                            _ => None,
                        }
                    }
                )+
            }
        }
    };
}
