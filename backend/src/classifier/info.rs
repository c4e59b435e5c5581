use lazy_static::lazy_static;
use shared::TumorClass;
use std::collections::HashMap;

/// Educational text shown next to a prediction. Not medical advice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    pub specialist: &'static str,
    pub info: &'static str,
}

lazy_static! {
    static ref INFO_TABLE: HashMap<TumorClass, ClassInfo> = {
        let mut table = HashMap::new();
        table.insert(
            TumorClass::GliomaTumor,
            ClassInfo {
                specialist: "Neuro-Oncologist or Neurosurgeon",
                info: "Gliomas are tumors from glial cells in the brain. Treatment often involves surgery, radiation, and chemotherapy.",
            },
        );
        table.insert(
            TumorClass::MeningiomaTumor,
            ClassInfo {
                specialist: "Neurosurgeon or Neurologist",
                info: "Meningiomas arise from the membranes surrounding the brain. Many are benign. Treatment may involve observation, surgery, or radiation.",
            },
        );
        table.insert(
            TumorClass::PituitaryTumor,
            ClassInfo {
                specialist: "Endocrinologist or Neurosurgeon",
                info: "Pituitary tumors develop in the pituitary gland and can affect hormone levels. Treatment includes surgery, medication, or radiation.",
            },
        );
        table.insert(
            TumorClass::NoTumor,
            ClassInfo {
                specialist: "N/A",
                info: "The model did not detect a tumor. This is not a medical diagnosis. Always consult a doctor for a definitive evaluation.",
            },
        );
        table
    };
}

pub fn lookup(class: TumorClass) -> Option<&'static ClassInfo> {
    INFO_TABLE.get(&class)
}
